//! Line chart of a trajectory.
//!
//! Every call builds its own [`Plot`]; nothing is shared between renders.

use crate::trajectory::{Compartment, Trajectory};

use plotly::color::NamedColor;
use plotly::common::{Line, Mode, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};
use std::io;
use std::path::Path;

fn colour(compartment: Compartment) -> NamedColor {
    match compartment {
        Compartment::Ctl => NamedColor::Blue,
        Compartment::Helper => NamedColor::Green,
        Compartment::Interleukin2 => NamedColor::Red,
        Compartment::Tumour => NamedColor::Magenta,
        Compartment::Suppression => NamedColor::Yellow,
    }
}

/// One line per compartment against time.
pub fn build_plot(trajectory: &Trajectory) -> Plot {
    let time = trajectory.times().to_vec();

    let mut plot = Plot::new();
    for compartment in Compartment::ALL.iter().copied() {
        let trace = Scatter::new(time.clone(), trajectory.column(compartment))
            .mode(Mode::Lines)
            .name(compartment.label())
            .line(Line::new().color(colour(compartment)));
        plot.add_trace(trace);
    }

    let layout = Layout::new()
        .x_axis(Axis::new().title(Title::with_text("Time")))
        .y_axis(Axis::new().title(Title::with_text("Population")));
    plot.set_layout(layout);
    plot
}

/// Renders the chart as a standalone HTML document.
pub fn render_html(trajectory: &Trajectory) -> String {
    build_plot(trajectory).to_html()
}

/// Renders the chart and writes it to `path`.
pub fn write_html<P: AsRef<Path>>(trajectory: &Trajectory, path: P) -> io::Result<()> {
    std::fs::write(path, render_html(trajectory))
}
