/// Simulation constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Seed for the scene's random number generator.
    pub seed: u64,

    /// Milliseconds a mobile actor may go unobserved before entering stasis.
    /// Actor configs may override it; 0 disables stasis.
    pub default_stasis_interval: i64,

    /// Maximum nesting of handler dispatch within one call chain.
    ///
    /// Bounds pathological self-triggering configurations such as a signal
    /// handler whose action signals its own owner.
    pub max_logic_depth: u32,

    /// Number of rings searched around a blocked spawn or warp point.
    pub placement_rings: u32,

    /// Longest path accepted when validating reachability.
    pub max_path_length: f32,

    /// Distance at which a path-following agent considers a waypoint reached.
    pub arrival_distance: f32,
}

impl SimConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_STASIS_INTERVAL: i64 = 5_000;
    pub const DEFAULT_MAX_LOGIC_DEPTH: u32 = 16;
    pub const DEFAULT_PLACEMENT_RINGS: u32 = 4;
    pub const DEFAULT_MAX_PATH_LENGTH: f32 = 32.0;
    pub const DEFAULT_ARRIVAL_DISTANCE: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            seed: 0,
            default_stasis_interval: Self::DEFAULT_STASIS_INTERVAL,
            max_logic_depth: Self::DEFAULT_MAX_LOGIC_DEPTH,
            placement_rings: Self::DEFAULT_PLACEMENT_RINGS,
            max_path_length: Self::DEFAULT_MAX_PATH_LENGTH,
            arrival_distance: Self::DEFAULT_ARRIVAL_DISTANCE,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::new()
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
