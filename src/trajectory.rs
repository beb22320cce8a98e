//! Simulated time series.

use crate::dop_shared::Stats;
use crate::model::State;
use std::fmt;
use std::io::{self, Write};

/// The five compartments of the model, in state vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compartment {
    Ctl,
    Helper,
    Interleukin2,
    Tumour,
    Suppression,
}

impl Compartment {
    /// All compartments, in column order.
    pub const ALL: [Compartment; 5] = [
        Compartment::Ctl,
        Compartment::Helper,
        Compartment::Interleukin2,
        Compartment::Tumour,
        Compartment::Suppression,
    ];

    /// Column of the compartment in the state vector.
    pub fn index(self) -> usize {
        match self {
            Compartment::Ctl => 0,
            Compartment::Helper => 1,
            Compartment::Interleukin2 => 2,
            Compartment::Tumour => 3,
            Compartment::Suppression => 4,
        }
    }

    /// Series label used by charts and CSV headers.
    pub fn label(self) -> &'static str {
        match self {
            Compartment::Ctl => "CTL cells",
            Compartment::Helper => "Th cells",
            Compartment::Interleukin2 => "IL-2",
            Compartment::Tumour => "Tumour cells",
            Compartment::Suppression => "Immune suppression factor",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// States reported at every point of a time grid, together with the solver statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<State>,
    stats: Stats,
}

impl Trajectory {
    pub(crate) fn new(times: Vec<f64>, states: Vec<State>, stats: Stats) -> Self {
        debug_assert_eq!(times.len(), states.len());
        Self {
            times,
            states,
            stats,
        }
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Statistics of the integration that produced the trajectory.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State at the first grid point.
    pub fn first(&self) -> Option<&State> {
        self.states.first()
    }

    /// State at the last grid point.
    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    /// Values of one compartment over the whole grid.
    pub fn column(&self, compartment: Compartment) -> Vec<f64> {
        let i = compartment.index();
        self.states.iter().map(|state| state[i]).collect()
    }

    /// Iterates over `(time, state)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &State)> {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Writes the trajectory as CSV: a header row, then one row per grid point.
    pub fn write_csv<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut buf = io::BufWriter::new(writer);

        write!(buf, "time")?;
        for compartment in Compartment::ALL.iter() {
            write!(buf, ",{}", compartment.label())?;
        }
        writeln!(buf)?;

        for (time, state) in self.iter() {
            write!(buf, "{}", time)?;
            for val in state.iter() {
                write!(buf, ",{}", val)?;
            }
            writeln!(buf)?;
        }
        buf.flush()
    }
}
