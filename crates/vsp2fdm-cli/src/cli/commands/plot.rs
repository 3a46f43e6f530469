use anyhow::Result;

use vsp2fdm_core::plot::{default_output, format_series, render_svg, PlotData, PlotFilter};

use crate::cli::args::PlotArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: PlotArgs) -> Result<i32> {
    let filter = PlotFilter::from_lists(
        args.aoa.as_deref(),
        args.mach.as_deref(),
        args.beta.as_deref(),
        args.wing.as_deref(),
    )?;
    let data = PlotData::load(&args.input, args.wake)?;

    let (default_x, default_y) = data.kind().default_axes();
    let x = args.x_axis.as_deref().unwrap_or(default_x);
    let y = args.y_axis.as_deref().unwrap_or(default_y);
    let series = data.series(x, y, &filter)?;

    if args.headless {
        print!("{}", format_series(&series));
        return Ok(SUCCESS);
    }

    let output = args.output.unwrap_or_else(|| default_output(&args.input));
    render_svg(&series, x, y, &output)?;
    println!("{}", output.display());
    Ok(SUCCESS)
}
