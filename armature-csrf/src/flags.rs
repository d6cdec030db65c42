/// Per-route overrides of the method-based defaults.
///
/// Resolved by the host from its route metadata. An unset flag means "use the
/// method-based default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteFlags {
    /// Never validate on this route
    pub skip_check: bool,
    /// Validate on this route regardless of method
    pub force_check: bool,
    /// Never generate a token on this route
    pub skip_generate: bool,
    /// Generate a token on this route regardless of method
    pub force_generate: bool,
}

impl RouteFlags {
    /// `true` forces validation, `false` disables it.
    pub fn check(enabled: bool) -> Self {
        Self {
            skip_check: !enabled,
            force_check: enabled,
            ..Default::default()
        }
    }

    /// `true` forces token generation, `false` disables it.
    pub fn generate(enabled: bool) -> Self {
        Self {
            skip_generate: !enabled,
            force_generate: enabled,
            ..Default::default()
        }
    }

    /// Combine two sets of flags.
    pub fn and(self, other: RouteFlags) -> Self {
        Self {
            skip_check: self.skip_check || other.skip_check,
            force_check: self.force_check || other.force_check,
            skip_generate: self.skip_generate || other.skip_generate,
            force_generate: self.force_generate || other.force_generate,
        }
    }
}
