//! Butcher tableaux of the Dormand-Prince 5(4) pair and of the Radau IIA method of order 5.

/// Coefficients of the Dormand-Prince method of order 5(4), with the error estimate
/// and the dense output of order 4.
///
/// Indices follow the usual one-based numbering of the stages (1 to 7).
pub mod dopri54 {
    /// Nodes c_i.
    pub fn c(i: usize) -> f64 {
        match i {
            2 => 1.0 / 5.0,
            3 => 3.0 / 10.0,
            4 => 4.0 / 5.0,
            5 => 8.0 / 9.0,
            6 | 7 => 1.0,
            _ => 0.0,
        }
    }

    /// Runge-Kutta matrix a_ij. Row 7 holds the weights of the 5th order solution.
    pub fn a(i: usize, j: usize) -> f64 {
        match (i, j) {
            (2, 1) => 1.0 / 5.0,
            (3, 1) => 3.0 / 40.0,
            (3, 2) => 9.0 / 40.0,
            (4, 1) => 44.0 / 45.0,
            (4, 2) => -56.0 / 15.0,
            (4, 3) => 32.0 / 9.0,
            (5, 1) => 19372.0 / 6561.0,
            (5, 2) => -25360.0 / 2187.0,
            (5, 3) => 64448.0 / 6561.0,
            (5, 4) => -212.0 / 729.0,
            (6, 1) => 9017.0 / 3168.0,
            (6, 2) => -355.0 / 33.0,
            (6, 3) => 46732.0 / 5247.0,
            (6, 4) => 49.0 / 176.0,
            (6, 5) => -5103.0 / 18656.0,
            (7, 1) => 35.0 / 384.0,
            (7, 3) => 500.0 / 1113.0,
            (7, 4) => 125.0 / 192.0,
            (7, 5) => -2187.0 / 6784.0,
            (7, 6) => 11.0 / 84.0,
            _ => 0.0,
        }
    }

    /// Difference between the 5th and 4th order weights, used for the error estimate.
    pub fn e(i: usize) -> f64 {
        match i {
            1 => 71.0 / 57600.0,
            3 => -71.0 / 16695.0,
            4 => 71.0 / 1920.0,
            5 => -17253.0 / 339200.0,
            6 => 22.0 / 525.0,
            7 => -1.0 / 40.0,
            _ => 0.0,
        }
    }

    /// Dense output coefficients.
    pub fn d(i: usize) -> f64 {
        match i {
            1 => -12715105075.0 / 11282082432.0,
            3 => 87487479700.0 / 32700410799.0,
            4 => -10690763975.0 / 1880347072.0,
            5 => 701980252875.0 / 199316789632.0,
            6 => -1453857185.0 / 822651844.0,
            7 => 69997945.0 / 29380423.0,
            _ => 0.0,
        }
    }
}

/// Radau IIA method of order 5 (three stages).
///
/// The collocation system is solved in the eigenbasis of the inverse Runge-Kutta matrix: `T` and
/// `TI` are the transformation and its inverse, `U1` the real eigenvalue and `ALPH +/- i BETA` the
/// complex pair. `DD*` weigh the stages in the embedded error estimate.
pub mod radau5 {
    pub const C1: f64 = 0.155_051_025_721_682_2;
    pub const C2: f64 = 0.644_948_974_278_317_8;
    pub const C1M1: f64 = C1 - 1.0;
    pub const C2M1: f64 = C2 - 1.0;
    pub const C1MC2: f64 = C1 - C2;

    pub const DD1: f64 = -10.048_809_399_827_416;
    pub const DD2: f64 = 1.382_142_733_160_749;
    pub const DD3: f64 = -0.333_333_333_333_333_3;

    pub const U1: f64 = 3.637_834_252_744_496;
    pub const ALPH: f64 = 2.681_082_873_627_752_3;
    pub const BETA: f64 = 3.050_430_199_247_410_5;

    pub const T11: f64 = 9.123_239_487_089_295E-2;
    pub const T12: f64 = -1.412_552_950_209_542E-1;
    pub const T13: f64 = -3.002_919_410_514_742_4E-2;
    pub const T21: f64 = 2.417_179_327_071_07E-1;
    pub const T22: f64 = 2.041_293_522_937_999_4E-1;
    pub const T23: f64 = 3.829_421_127_572_619E-1;
    pub const T31: f64 = 9.660_481_826_150_93E-1;

    pub const TI11: f64 = 4.325_579_890_063_155;
    pub const TI12: f64 = 3.391_992_518_158_098_4E-1;
    pub const TI13: f64 = 5.417_705_399_358_749E-1;
    pub const TI21: f64 = -4.178_718_591_551_905;
    pub const TI22: f64 = -3.276_828_207_610_623_7E-1;
    pub const TI23: f64 = 4.766_235_545_005_504_4E-1;
    pub const TI31: f64 = -5.028_726_349_457_868E-1;
    pub const TI32: f64 = 2.571_926_949_855_605;
    pub const TI33: f64 = -5.960_392_048_282_249E-1;
}
