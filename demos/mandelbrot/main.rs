use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use x264_session::{EncoderOptions, X264Session};

use crate::fractal::Mandelbrot;

mod fractal;

/// Renders a zooming Mandelbrot set and writes it as a raw H.264 stream.
///
/// The output plays in VLC or `ffplay`. Dimensions divisible by 16 avoid
/// padding inside the encoder.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 192)]
    height: u32,

    #[arg(short, long, default_value_t = 100)]
    frames: u32,

    /// Zoom reached on the last frame, as a power of two.
    #[arg(long, default_value_t = 24.0)]
    max_zoom_power: f64,

    #[arg(short, long, default_value_t = 1)]
    threads: u32,

    #[arg(short, long, default_value = "out.h264")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    let mut encoder = X264Session::with_options(EncoderOptions::with_threads(args.width, args.height, args.threads))?;
    log::info!(
        "Encoding {} frames at {}x{} with {} threads",
        args.frames,
        encoder.width(),
        encoder.height(),
        encoder.threads()
    );

    let mut output = BufWriter::new(File::create(&args.output)?);
    let fractal = Mandelbrot::new(args.width as usize, args.height as usize);

    for frame in 0..args.frames {
        if frame % 5 == 0 {
            log::info!("Building frame {} / {}", frame, args.frames);
        }

        let progress = frame as f64 / args.frames as f64;
        let zoom = 2f64.powf(progress * args.max_zoom_power + 1.0) - 1.0;
        let rgb = fractal.render(zoom);

        let encoded = encoder.encode_frame_as_whole_buffer(&rgb)?;
        output.write_all(&encoded)?;
    }

    output.flush()?;
    encoder.dispose();

    log::info!("Wrote {}", args.output.display());

    Ok(())
}
