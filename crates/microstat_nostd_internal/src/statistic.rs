use crate::reducer::Datum;

/// Classifies the values stored in a field.
///
/// This is used to reject pairings of fields and statistics that don't make
/// sense (e.g. a floating point field under an indicator statistic).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// booleans (foreground/background)
    Binary,
    /// integers (phases or cluster labels)
    Integer,
    /// floating point values
    Scalar,
}

/// The statistics that an ensemble can accumulate.
///
/// The statistic is picked once, when an ensemble is constructed. Pair-based
/// statistics reduce a pair of field samples `(a, b)`, taken at `𝒙` and
/// `𝒙+𝒓`, into a [`Datum`] with [`Statistic::pair_datum`]. The remaining
/// statistics ([`Statistic::Mean`], [`Statistic::W2c`] and
/// [`Statistic::LinealPath`]) are driven by dedicated loops but feed the very
/// same accumulators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Statistic {
    /// weighted running mean of a field
    Mean,
    /// two-point probability: both endpoints are in the foreground
    S2,
    /// two-point cluster (cross-)correlation: both endpoints carry the same
    /// non-zero value
    C2,
    /// weighted two-point function: the value at `𝒙+𝒓` weighted by the value
    /// at `𝒙`
    W2,
    /// collapsed weighted correlation, measured from the edge of clusters
    W2c,
    /// mean squared difference between the values at `𝒙` and `𝒙+𝒓`
    HeightHeight,
    /// lineal path function: the straight path between `𝒙` and `𝒙+𝒓` lies
    /// entirely in the foreground
    LinealPath,
}

impl Statistic {
    pub const ALL: [Statistic; 7] = [
        Statistic::Mean,
        Statistic::S2,
        Statistic::C2,
        Statistic::W2,
        Statistic::W2c,
        Statistic::HeightHeight,
        Statistic::LinealPath,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::S2 => "S2",
            Statistic::C2 => "C2",
            Statistic::W2 => "W2",
            Statistic::W2c => "W2c",
            Statistic::HeightHeight => "heightheight",
            Statistic::LinealPath => "L",
        }
    }

    /// look up a statistic by name (see [`Statistic::name`])
    pub fn from_name(name: &str) -> Option<Statistic> {
        Statistic::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Whether the statistic compares the values at the two ends of a lag
    pub fn is_pairwise(&self) -> bool {
        matches!(
            self,
            Statistic::S2 | Statistic::C2 | Statistic::W2 | Statistic::HeightHeight
        )
    }

    /// Whether a field of the specified kind can be used as the (primary)
    /// input of this statistic
    pub fn accepts(&self, kind: FieldKind) -> bool {
        match self {
            Statistic::S2 | Statistic::C2 | Statistic::LinealPath => kind != FieldKind::Scalar,
            Statistic::Mean | Statistic::W2 | Statistic::W2c | Statistic::HeightHeight => true,
        }
    }

    /// reduce the values at the two ends of a lag into a datum.
    ///
    /// This assumes that the statistic is pairwise (see
    /// [`Statistic::is_pairwise`]); for other statistics the datum carries no
    /// weight.
    #[inline(always)]
    pub fn pair_datum(&self, a: f64, b: f64) -> Datum {
        match self {
            Statistic::S2 => Datum::unweighted(indicator((a != 0.0) && (b != 0.0))),
            Statistic::C2 => Datum::unweighted(indicator((a != 0.0) && (a == b))),
            Statistic::W2 => Datum {
                value: b,
                weight: a,
            },
            Statistic::HeightHeight => {
                let diff = b - a;
                Datum::unweighted(diff * diff)
            }
            Statistic::Mean | Statistic::W2c | Statistic::LinealPath => Datum::zeroed(),
        }
    }
}

#[inline(always)]
fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}
