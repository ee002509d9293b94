use colored::Colorize;

use brinson_core::attribution::waterfall::{BarKind, WaterfallChart};

/// Draw a waterfall chart in the terminal, coloured by bar direction.
pub fn print_waterfall(chart: &WaterfallChart, width: usize) {
    println!("{}", chart.title.bold());
    for (bar, line) in chart.bars.iter().zip(chart.render_lines(width)) {
        let painted = match bar.kind {
            BarKind::Increase => line.green(),
            BarKind::Decrease => line.red(),
            BarKind::Flat => line.dimmed(),
            BarKind::Net => line.blue().bold(),
        };
        println!("{}", painted);
    }
}
