//! Integer generators with size-driven bias.

use super::{Gen, GenInstance, GenIteration};
use crate::data::{GenParameters, Rng, Size};
use crate::shrink;
use crate::space::ExampleSpace;
use std::fmt::{Debug, Display};
use std::hash::Hash;

const GEN_NAME: &str = "IntegerGen";

/// Primitive integer types that can be generated.
pub trait Integer: Copy + Eq + Ord + Hash + Debug + Display + 'static {
    const MIN: Self;
    const MAX: Self;

    fn to_i128(self) -> i128;

    /// Narrow a value known to be in `MIN..=MAX`.
    fn from_i128(value: i128) -> Self;
}

macro_rules! impl_integer {
    ($($t:ty),*) => {
        $(
            impl Integer for $t {
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, u8, u16, u32);

/// How size influences the range values are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Uniform over the whole range at every size.
    None,
    /// Range grows exponentially with size around the origin, with an
    /// occasional jump to one of the bounds.
    WithSize,
}

/// Builder for integer generators.
///
/// ```rust
/// use galaxycheck_core::*;
///
/// let gen: Gen<i32> = Gen::int32().between(0, 100).shrink_towards(10).build();
/// ```
#[derive(Debug, Clone)]
pub struct IntegerGen<T> {
    min: Option<i128>,
    max: Option<i128>,
    origin: Option<i128>,
    bias: Bias,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Integer> Default for IntegerGen<T> {
    fn default() -> Self {
        IntegerGen {
            min: None,
            max: None,
            origin: None,
            bias: Bias::WithSize,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Integer> IntegerGen<T> {
    /// Constrain to `[x, y]`. The bounds may be given in either order.
    pub fn between(mut self, x: T, y: T) -> Self {
        let (x, y) = (x.to_i128(), y.to_i128());
        self.min = Some(x.min(y));
        self.max = Some(x.max(y));
        self
    }

    pub fn greater_than_equal(mut self, min: T) -> Self {
        self.min = Some(min.to_i128());
        self
    }

    pub fn less_than_equal(mut self, max: T) -> Self {
        self.max = Some(max.to_i128());
        self
    }

    pub fn greater_than(mut self, bound: T) -> Self {
        self.min = Some(bound.to_i128() + 1);
        self
    }

    pub fn less_than(mut self, bound: T) -> Self {
        self.max = Some(bound.to_i128() - 1);
        self
    }

    /// The value shrinking moves towards.
    pub fn shrink_towards(mut self, origin: T) -> Self {
        self.origin = Some(origin.to_i128());
        self
    }

    pub fn with_bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }

    pub fn build(self) -> Gen<T> {
        let min = self.min.unwrap_or(T::MIN.to_i128());
        let max = self.max.unwrap_or(T::MAX.to_i128());
        if min > max {
            return Gen::error(GEN_NAME, "'min' cannot be greater than 'max'");
        }

        // The in-range value closest to zero.
        let origin = self.origin.unwrap_or_else(|| 0.clamp(min, max));
        if origin < min || origin > max {
            return Gen::error(GEN_NAME, "'origin' must be between 'min' and 'max'");
        }

        let bias = self.bias;
        Gen::new(move |parameters| integer_iteration(parameters, min, max, origin, bias))
            .map(|value| T::from_i128(*value))
    }
}

impl<T: Integer> From<IntegerGen<T>> for Gen<T> {
    fn from(builder: IntegerGen<T>) -> Self {
        builder.build()
    }
}

impl<T: Integer> Gen<T> {
    /// Start building a generator for any supported integer type.
    pub fn integer() -> IntegerGen<T> {
        IntegerGen::default()
    }
}

impl Gen<i8> {
    pub fn int8() -> IntegerGen<i8> {
        IntegerGen::default()
    }
}

impl Gen<i16> {
    pub fn int16() -> IntegerGen<i16> {
        IntegerGen::default()
    }
}

impl Gen<i32> {
    pub fn int32() -> IntegerGen<i32> {
        IntegerGen::default()
    }

    /// Generate an integer in the given range.
    pub fn int_range(min: i32, max: i32) -> Self {
        Gen::int32().between(min, max).build()
    }

    /// Generate a positive integer.
    pub fn positive() -> Self {
        Gen::int32().greater_than_equal(1).build()
    }

    /// Generate a natural number (including zero).
    pub fn natural() -> Self {
        Gen::int32().greater_than_equal(0).build()
    }
}

impl Gen<i64> {
    pub fn int64() -> IntegerGen<i64> {
        IntegerGen::default()
    }
}

impl Gen<u8> {
    pub fn byte() -> IntegerGen<u8> {
        IntegerGen::default()
    }
}

impl Gen<u16> {
    pub fn uint16() -> IntegerGen<u16> {
        IntegerGen::default()
    }
}

impl Gen<u32> {
    pub fn uint32() -> IntegerGen<u32> {
        IntegerGen::default()
    }
}

fn integer_iteration(
    parameters: GenParameters,
    min: i128,
    max: i128,
    origin: i128,
    bias: Bias,
) -> GenIteration<i128> {
    let (low, high, rng) = match bias {
        Bias::None => (min, max, parameters.rng),
        Bias::WithSize => biased_bounds(parameters.rng, parameters.size, min, max, origin),
    };
    let value = rng.value(low as i64, high as i64) as i128;

    GenIteration::Instance(GenInstance {
        replay_parameters: parameters,
        next_parameters: parameters.with_rng(rng.next()),
        example_space: ExampleSpace::unfold(
            value,
            shrink::integer_towards(origin),
            shrink::integer_distance(origin, min, max),
            shrink::identify_hashed(),
        ),
    })
}

/// Relative weight of the size-scaled range against a single extreme.
///
/// 16 up to size 50, then falling exponentially to 1 at size 100.
pub(crate) fn extreme_weight(size: Size) -> i64 {
    let size = size.get();
    if size <= 50 {
        16
    } else {
        16f64.powf((100 - size) as f64 / 50.0).round() as i64
    }
}

/// Scale an extent away from the origin by size: nothing at size 0, the full
/// extent at size 100, exponential in between.
pub(crate) fn scaled_extent(extent: i128, size: Size) -> i128 {
    if size.is_max() {
        return extent;
    }
    let scaled = ((extent as f64 + 1.0).powf(size.fraction()) - 1.0).round();
    (scaled as i128).clamp(0, extent)
}

/// Bounds to draw from, and the source to draw with.
fn biased_bounds(rng: Rng, size: Size, min: i128, max: i128, origin: i128) -> (i128, i128, Rng) {
    let weight = extreme_weight(size);
    let pick = rng.value(0, weight);
    let rng = rng.next();
    if pick == weight {
        let extreme = if rng.value(0, 1) == 0 { min } else { max };
        return (extreme, extreme, rng.next());
    }

    let low = origin - scaled_extent(origin - min, size);
    let high = origin + scaled_extent(max - origin, size);
    (low, high, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GalaxyError;

    fn values<T: Integer>(gen: &Gen<T>, seed: i32, size: usize, count: usize) -> Vec<T> {
        let parameters = GenParameters::create(Rng::create(seed), Size::new(size));
        gen.iterations(parameters)
            .take(count)
            .filter_map(|iteration| match iteration {
                GenIteration::Instance(instance) => Some(instance.example_space.current().value),
                _ => None,
            })
            .collect()
    }

    fn error_message<T: Integer>(gen: &Gen<T>) -> Option<String> {
        let parameters = GenParameters::create(Rng::create(0), Size::MIN);
        match gen.run(parameters) {
            GenIteration::Error(error) => Some(
                GalaxyError::Generator {
                    gen_name: error.gen_name,
                    message: error.message,
                    replay: None,
                }
                .to_string(),
            ),
            _ => None,
        }
    }

    #[test]
    fn test_between_stays_in_range() {
        let gen = Gen::int32().between(-20, 35).build();
        for size in [0, 25, 50, 75, 100] {
            for value in values(&gen, 17, size, 200) {
                assert!((-20..=35).contains(&value), "{value} out of range");
            }
        }
    }

    #[test]
    fn test_between_accepts_reversed_bounds() {
        let gen = Gen::int32().between(10, 0).build();
        for value in values(&gen, 3, 100, 100) {
            assert!((0..=10).contains(&value));
        }
    }

    #[test]
    fn test_min_greater_than_max_is_an_error() {
        let gen = Gen::int32().greater_than_equal(10).less_than_equal(5).build();
        assert_eq!(
            error_message(&gen),
            Some("Error while running generator IntegerGen: 'min' cannot be greater than 'max'".to_string())
        );
    }

    #[test]
    fn test_origin_outside_range_is_an_error() {
        let gen = Gen::int32().between(0, 10).shrink_towards(20).build();
        assert_eq!(
            error_message(&gen),
            Some("Error while running generator IntegerGen: 'origin' must be between 'min' and 'max'".to_string())
        );
    }

    #[test]
    fn test_exclusive_bounds() {
        let gen = Gen::<u8>::integer().greater_than(250).build();
        for value in values(&gen, 8, 100, 100) {
            assert!(value > 250);
        }
        let gen = Gen::<u8>::integer().greater_than(u8::MAX).build();
        assert!(error_message(&gen).is_some());
    }

    #[test]
    fn test_size_zero_without_extremes_is_origin() {
        let gen = Gen::int32().between(-1000, 1000).build();
        for value in values(&gen, 5, 0, 300) {
            assert!(value == 0 || value == -1000 || value == 1000);
        }
    }

    #[test]
    fn test_unbiased_covers_range_at_size_zero() {
        let gen = Gen::int32().between(0, 3).with_bias(Bias::None).build();
        let mut seen = values(&gen, 21, 0, 200);
        seen.sort();
        seen.dedup();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_origin_defaults_closest_to_zero() {
        let parameters = GenParameters::create(Rng::create(1), Size::MAX);
        let gen = Gen::int32().between(5, 100).build();
        if let GenIteration::Instance(instance) = gen.run(parameters) {
            let simplest = instance.example_space.subspace().next().map(|c| c.current().value);
            let root = instance.example_space.current().value;
            if root != 5 {
                assert_eq!(simplest, Some(5));
            }
        } else {
            panic!("Expected instance");
        }
    }

    #[test]
    fn test_extreme_weight() {
        assert_eq!(extreme_weight(Size::new(0)), 16);
        assert_eq!(extreme_weight(Size::new(50)), 16);
        assert_eq!(extreme_weight(Size::new(75)), 4);
        assert_eq!(extreme_weight(Size::new(100)), 1);
    }

    #[test]
    fn test_scaled_extent() {
        assert_eq!(scaled_extent(100, Size::new(0)), 0);
        assert_eq!(scaled_extent(100, Size::new(50)), 9);
        assert_eq!(scaled_extent(100, Size::new(100)), 100);
        assert_eq!(scaled_extent(i64::MAX as i128, Size::MAX), i64::MAX as i128);
        assert!(scaled_extent(i64::MAX as i128, Size::new(99)) <= i64::MAX as i128);
    }

    #[test]
    fn test_full_width_types() {
        let gen = Gen::int64().build();
        assert_eq!(values(&gen, 2, 100, 50).len(), 50);
        let gen = Gen::uint32().build();
        assert_eq!(values(&gen, 2, 100, 50).len(), 50);
    }
}
