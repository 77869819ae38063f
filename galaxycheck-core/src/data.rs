//! Core data types: size, the deterministic random source, generator
//! parameters and check configuration.

use std::fmt;

/// Size parameter for controlling test data generation.
///
/// Size is clamped to `0..=100`. Larger sizes let generators produce larger
/// and more extreme values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(usize);

impl Size {
    /// The smallest size.
    pub const MIN: Size = Size(0);

    /// The largest size.
    pub const MAX: Size = Size(100);

    /// Create a new size value, clamped to the valid range.
    pub fn new(value: usize) -> Self {
        Size(value.min(Self::MAX.0))
    }

    /// Get the inner size value.
    pub fn get(&self) -> usize {
        self.0
    }

    /// The next size in a sequence of check iterations.
    pub fn increment(&self) -> Self {
        Size::new(self.0 + 1)
    }

    /// A larger step, used when reaching for a bigger counterexample.
    pub fn big_increment(&self) -> Self {
        Size::new(self.0 + 10)
    }

    pub fn is_max(&self) -> bool {
        *self == Self::MAX
    }

    /// The size as a fraction of the maximum, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        self.0 as f64 / Self::MAX.0 as f64
    }
}

impl From<usize> for Size {
    fn from(value: usize) -> Self {
        Size::new(value)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Size({})", self.0)
    }
}

const NEXT_SALT: u64 = 0x6a09e667f3bcc908;
const FORK_SALT: u64 = 0xbb67ae8584caa73b;
const VALUE_SALT: u64 = 0x3c6ef372fe94f82b;

/// Immutable, splittable pseudo-random source.
///
/// An `Rng` never mutates: `value` is a pure function of the seed and the
/// requested bounds, and `next`/`fork` derive new sources. Determinism here is
/// what makes replaying a counterexample possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rng {
    seed: i32,
    order: i32,
}

impl Rng {
    /// Create a source from an explicit seed.
    pub fn create(seed: i32) -> Self {
        Rng { seed, order: 0 }
    }

    /// Restore a source at a known position, as recorded in a replay.
    pub fn at(seed: i32, order: i32) -> Self {
        Rng { seed, order }
    }

    /// Create a source seeded from system entropy.
    pub fn spawn() -> Self {
        use rand::Rng as _;
        Rng::create(rand::thread_rng().gen())
    }

    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// How many derivations led to this source.
    pub fn order(&self) -> i32 {
        self.order
    }

    /// The next source in this stream.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Rng {
        Rng {
            seed: derive_seed(self.seed, NEXT_SALT),
            order: self.order.wrapping_add(1),
        }
    }

    /// A child stream whose values are uncorrelated with `next`'s stream.
    pub fn fork(&self) -> Rng {
        Rng {
            seed: derive_seed(self.seed, FORK_SALT),
            order: self.order.wrapping_add(1),
        }
    }

    /// A value in `[min, max]`. Bounds are swapped if given out of order.
    pub fn value(&self, min: i64, max: i64) -> i64 {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let span = (max as i128 - min as i128 + 1) as u128;
        let raw = splitmix64_mix(seed_bits(self.seed) ^ VALUE_SALT) as u128;
        let offset = (raw * span) >> 64;
        (min as i128 + offset as i128) as i64
    }
}

impl fmt::Display for Rng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rng({}, order {})", self.seed, self.order)
    }
}

fn seed_bits(seed: i32) -> u64 {
    seed as u32 as u64
}

fn derive_seed(seed: i32, salt: u64) -> i32 {
    (splitmix64_mix(seed_bits(seed) ^ salt) >> 32) as i32
}

/// SplitMix64 mixing function for high-quality output.
fn splitmix64_mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// The state a generator is run with.
///
/// The waypoint lets a later sub-generator realign to an earlier point in the
/// random stream, independently of how much randomness was consumed between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenParameters {
    pub rng: Rng,
    pub size: Size,
    pub rng_waypoint: Option<Rng>,
}

impl GenParameters {
    pub fn create(rng: Rng, size: Size) -> Self {
        GenParameters {
            rng,
            size,
            rng_waypoint: None,
        }
    }

    pub fn with_rng(self, rng: Rng) -> Self {
        GenParameters { rng, ..self }
    }

    pub fn with_size(self, size: Size) -> Self {
        GenParameters { size, ..self }
    }

    pub fn with_rng_waypoint(self, rng_waypoint: Option<Rng>) -> Self {
        GenParameters {
            rng_waypoint,
            ..self
        }
    }
}

impl fmt::Display for GenParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seed {}, {}", self.rng.seed(), self.size)
    }
}

/// Number of consecutive discards after which a run is considered exhausted.
pub const DEFAULT_DISCARD_LIMIT: usize = 1000;

/// Configuration for checking properties.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of test iterations to run.
    pub iterations: usize,

    /// Maximum number of shrinks to attempt across the whole check.
    pub shrink_limit: usize,

    /// Seed to start from. A fresh seed is spawned when absent.
    pub seed: Option<i32>,

    /// Size to start from. Defaults to `Size::MIN`.
    pub size: Option<Size>,

    /// Keep reaching for smaller counterexamples after the first one.
    pub deep_check: bool,

    /// Replay token of a previously found counterexample.
    pub replay: Option<String>,

    /// Maximum number of consecutive discards before giving up.
    pub discard_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            iterations: 100,
            shrink_limit: 500,
            seed: None,
            size: None,
            deep_check: true,
            replay: None,
            discard_limit: DEFAULT_DISCARD_LIMIT,
        }
    }
}

impl Config {
    /// Defaults overridden by `GALAXYCHECK_*` environment variables.
    pub fn from_env() -> Self {
        let config = Config::default();
        let config = match env_value::<usize>("GALAXYCHECK_ITERATIONS") {
            Some(iterations) => config.with_iterations(iterations),
            None => config,
        };
        let config = match env_value::<i32>("GALAXYCHECK_SEED") {
            Some(seed) => config.with_seed(seed),
            None => config,
        };
        let config = match env_value::<usize>("GALAXYCHECK_SHRINK_LIMIT") {
            Some(limit) => config.with_shrink_limit(limit),
            None => config,
        };
        match std::env::var("GALAXYCHECK_REPLAY") {
            Ok(replay) if !replay.is_empty() => config.with_replay(replay),
            _ => config,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_shrink_limit(mut self, shrink_limit: usize) -> Self {
        self.shrink_limit = shrink_limit;
        self
    }

    pub fn with_seed(mut self, seed: i32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_deep_check(mut self, deep_check: bool) -> Self {
        self.deep_check = deep_check;
        self
    }

    pub fn with_replay(mut self, replay: impl Into<String>) -> Self {
        self.replay = Some(replay.into());
        self
    }

    pub fn with_discard_limit(mut self, discard_limit: usize) -> Self {
        self.discard_limit = discard_limit;
        self
    }

    /// The parameters the first iteration is generated with.
    pub fn initial_parameters(&self) -> GenParameters {
        let rng = self.seed.map(Rng::create).unwrap_or_else(Rng::spawn);
        GenParameters::create(rng, self.size.unwrap_or(Size::MIN))
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable configuration override");
            None
        }
    }
}
