//! Functions callable from predicate expressions.
//!
//! The set is closed: random draws that consume the run's generator, the
//! `random_bit` clamp helper, and a few numeric helpers. Every call may be
//! written with or without a `random.` prefix, so `random.gauss(mu=0.5, sigma=0.4)`
//! and `gauss(0.5, 0.4)` are the same expression.

use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal, Normal, Triangular};

use crate::ast::CmpOp;
use crate::eval::{EvalError, Value};

/// A declared parameter of a builtin.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

const fn req(name: &'static str) -> Param {
    Param { name, required: true }
}

const fn opt(name: &'static str) -> Param {
    Param { name, required: false }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Builtin {
    Random,
    Uniform,
    Randint,
    Gauss,
    NormalVariate,
    LogNormVariate,
    ExpoVariate,
    Triangular,
    RandomBit,
    Abs,
    Min,
    Max,
}

impl Builtin {
    pub const ALL: [Builtin; 12] = [
        Builtin::Random,
        Builtin::Uniform,
        Builtin::Randint,
        Builtin::Gauss,
        Builtin::NormalVariate,
        Builtin::LogNormVariate,
        Builtin::ExpoVariate,
        Builtin::Triangular,
        Builtin::RandomBit,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Random => "random",
            Builtin::Uniform => "uniform",
            Builtin::Randint => "randint",
            Builtin::Gauss => "gauss",
            Builtin::NormalVariate => "normalvariate",
            Builtin::LogNormVariate => "lognormvariate",
            Builtin::ExpoVariate => "expovariate",
            Builtin::Triangular => "triangular",
            Builtin::RandomBit => "random_bit",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }

    /// Declared parameters, in positional order.
    ///
    /// Variadic builtins declare none and accept two or more positional arguments.
    pub fn params(self) -> &'static [Param] {
        const NONE: &[Param] = &[];
        const AB: &[Param] = &[req("a"), req("b")];
        const NORMAL: &[Param] = &[opt("mu"), opt("sigma")];
        const LOGNORMAL: &[Param] = &[req("mu"), req("sigma")];
        const EXPO: &[Param] = &[opt("lambd")];
        const TRIANGULAR: &[Param] = &[opt("low"), opt("high"), opt("mode")];
        const RANDOM_BIT: &[Param] = &[opt("clamp_low"), opt("clamp_high"), opt("fun")];
        const ABS: &[Param] = &[req("x")];

        match self {
            Builtin::Random => NONE,
            Builtin::Uniform | Builtin::Randint => AB,
            Builtin::Gauss | Builtin::NormalVariate => NORMAL,
            Builtin::LogNormVariate => LOGNORMAL,
            Builtin::ExpoVariate => EXPO,
            Builtin::Triangular => TRIANGULAR,
            Builtin::RandomBit => RANDOM_BIT,
            Builtin::Abs => ABS,
            Builtin::Min | Builtin::Max => NONE,
        }
    }

    pub fn is_variadic(self) -> bool {
        matches!(self, Builtin::Min | Builtin::Max)
    }

    /// Whether a call consumes randomness by itself, regardless of its arguments.
    pub fn is_random(self) -> bool {
        !matches!(self, Builtin::Abs | Builtin::Min | Builtin::Max)
    }

    /// Apply the builtin to already evaluated arguments.
    ///
    /// `args` holds one slot per declared parameter (`None` takes the default),
    /// or every positional argument for variadic builtins.
    pub fn apply<R>(self, args: &[Option<Value>], rng: &mut R) -> Result<Value, EvalError>
    where
        R: Rng + ?Sized,
    {
        let arg = |i: usize| args.get(i).copied().flatten();
        let float_or = |i: usize, default: f64| arg(i).map_or(default, Value::as_f64);

        match self {
            Builtin::Random => Ok(Value::Float(rng.random::<f64>())),
            Builtin::Uniform => {
                let a = float_or(0, 0.0);
                let b = float_or(1, 0.0);
                Ok(Value::Float(a + (b - a) * rng.random::<f64>()))
            }
            Builtin::Randint => {
                let a = required(self, arg(0))?.as_int()?;
                let b = required(self, arg(1))?.as_int()?;
                if a > b {
                    return Err(EvalError::InvalidArgument(format!("empty range for randint({}, {})", a, b)));
                }
                Ok(Value::Int(rng.random_range(a..=b)))
            }
            // A negative sigma mirrors the draw around mu, which is the same distribution.
            Builtin::Gauss | Builtin::NormalVariate => {
                let mu = float_or(0, 0.0);
                let sigma = float_or(1, 1.0).abs();
                let normal = Normal::new(mu, sigma).map_err(|e| invalid(self, e))?;
                Ok(Value::Float(normal.sample(rng)))
            }
            Builtin::LogNormVariate => {
                let mu = float_or(0, 0.0);
                let sigma = float_or(1, 1.0).abs();
                let lognormal = LogNormal::new(mu, sigma).map_err(|e| invalid(self, e))?;
                Ok(Value::Float(lognormal.sample(rng)))
            }
            Builtin::ExpoVariate => {
                let lambd = float_or(0, 1.0);
                if !(lambd > 0.0) {
                    return Err(EvalError::InvalidArgument(format!("expovariate rate must be positive, got {}", lambd)));
                }
                let exp = Exp::new(lambd).map_err(|e| invalid(self, e))?;
                Ok(Value::Float(exp.sample(rng)))
            }
            Builtin::Triangular => {
                let low = float_or(0, 0.0);
                let high = float_or(1, 1.0);
                let mode = float_or(2, (low + high) / 2.0);
                if low == high {
                    return Ok(Value::Float(low));
                }
                let (low, high) = if low < high { (low, high) } else { (high, low) };
                let triangular = Triangular::new(low, high, mode).map_err(|e| invalid(self, e))?;
                Ok(Value::Float(triangular.sample(rng)))
            }
            Builtin::RandomBit => {
                let low = float_or(0, 0.0);
                let high = float_or(1, 1.0);
                let draw = match arg(2) {
                    Some(v) => v.as_f64(),
                    None => rng.random::<f64>(),
                };
                Ok(Value::Bool(low <= draw && draw <= high))
            }
            Builtin::Abs => required(self, arg(0))?.abs(),
            Builtin::Min | Builtin::Max => {
                let mut values = args.iter().flatten().copied();
                let first = values
                    .next()
                    .ok_or_else(|| EvalError::InvalidArgument(format!("{} expects arguments", self.name())))?;
                Ok(values.fold(first, |best, v| {
                    let pick_new = if self == Builtin::Min {
                        v.compare(CmpOp::Lt, best)
                    } else {
                        best.compare(CmpOp::Lt, v)
                    };
                    if pick_new {
                        v
                    } else {
                        best
                    }
                }))
            }
        }
    }
}

fn required(builtin: Builtin, value: Option<Value>) -> Result<Value, EvalError> {
    value.ok_or_else(|| EvalError::InvalidArgument(format!("{} is missing an argument", builtin.name())))
}

fn invalid(builtin: Builtin, err: impl std::fmt::Display) -> EvalError {
    EvalError::InvalidArgument(format!("{}: {}", builtin.name(), err))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn call(builtin: Builtin, args: &[Option<Value>]) -> Result<Value, EvalError> {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        builtin.apply(args, &mut rng)
    }

    #[test]
    fn test_lookup_roundtrip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::lookup(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::lookup("eval"), None);
    }

    #[test]
    fn test_random_in_unit_interval() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let x = Builtin::Random.apply(&[], &mut rng).unwrap().as_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_randint_inclusive() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = Builtin::Randint
                .apply(&[Some(Value::Int(1)), Some(Value::Int(3))], &mut rng)
                .unwrap();
            match v {
                Value::Int(n) => seen[(n - 1) as usize] = true,
                other => panic!("expected int, got {:?}", other),
            }
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn test_randint_empty_range() {
        let err = call(Builtin::Randint, &[Some(Value::Int(3)), Some(Value::Int(1))]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument(_)));
    }

    #[test]
    fn test_gauss_accepts_negative_sigma() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 2000;
        let mut sum = 0.0;
        for _ in 0..n {
            let args = [Some(Value::Float(5.0)), Some(Value::Float(-0.5))];
            sum += Builtin::Gauss.apply(&args, &mut rng).unwrap().as_f64();
        }
        assert!((sum / n as f64 - 5.0).abs() < 0.1);
        let args = [Some(Value::Int(0)), Some(Value::Int(-1))];
        assert!(call(Builtin::LogNormVariate, &args).unwrap().as_f64() > 0.0);
    }

    #[test]
    fn test_gauss_rejects_nan_sigma() {
        let err = call(Builtin::Gauss, &[Some(Value::Float(0.0)), Some(Value::Float(f64::NAN))]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument(_)));
    }

    #[test]
    fn test_triangular_rejects_mode_outside_range() {
        let args = [Some(Value::Float(0.0)), Some(Value::Float(1.0)), Some(Value::Float(2.0))];
        assert!(matches!(call(Builtin::Triangular, &args), Err(EvalError::InvalidArgument(_))));
    }

    #[test]
    fn test_expovariate_rejects_zero_rate() {
        let err = call(Builtin::ExpoVariate, &[Some(Value::Int(0))]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument(_)));
    }

    #[test]
    fn test_triangular_degenerate() {
        let v = call(Builtin::Triangular, &[Some(Value::Float(2.0)), Some(Value::Float(2.0)), None]).unwrap();
        assert_eq!(v, Value::Float(2.0));
    }

    #[test]
    fn test_random_bit_clamps_given_draw() {
        let args = |draw: f64| [Some(Value::Float(0.3)), Some(Value::Float(0.6)), Some(Value::Float(draw))];
        assert_eq!(call(Builtin::RandomBit, &args(0.3)).unwrap(), Value::Bool(true));
        assert_eq!(call(Builtin::RandomBit, &args(0.6)).unwrap(), Value::Bool(true));
        assert_eq!(call(Builtin::RandomBit, &args(0.61)).unwrap(), Value::Bool(false));
        assert_eq!(call(Builtin::RandomBit, &args(0.1)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_random_bit_default_is_always_true() {
        assert_eq!(call(Builtin::RandomBit, &[None, None, None]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_min_max_abs() {
        let args = [Some(Value::Int(3)), Some(Value::Float(-1.5)), Some(Value::Bool(true))];
        assert_eq!(call(Builtin::Min, &args).unwrap(), Value::Float(-1.5));
        assert_eq!(call(Builtin::Max, &args).unwrap(), Value::Int(3));
        assert_eq!(call(Builtin::Abs, &[Some(Value::Int(-4))]).unwrap(), Value::Int(4));
    }
}
