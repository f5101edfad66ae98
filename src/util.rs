const PROFILE_ENV: &str = "VIGIL_PROFILE";

const DEFAULT_PROFILE: &str = "production";

/// The profile selector from the environment, defaulting to `production`.
///
/// Absence of the variable is fine; an unrecognized name is rejected later,
/// at resolution time.
pub fn get_profile_selector() -> String {
    std::env::var(PROFILE_ENV).unwrap_or_else(|_| DEFAULT_PROFILE.to_string())
}
