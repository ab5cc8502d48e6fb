use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use activity_overlay::{decode_activity_file, download_filename, format_stats, UnitSystem};
use activity_overlay_embedded_graphics::{
    draw_watermark, embedded_composer, load_watermark_logos, EgRenderConfig, EgRenderer,
    RgbCanvas,
};
use activity_overlay_render::{OverlayOptions, RouteOptions};
use embedded_graphics::pixelcolor::Rgb888;

const DEFAULT_WIDTH: u32 = 1600;
const DEFAULT_HEIGHT: u32 = 1200;

#[derive(Clone, Debug)]
struct Args {
    activity: PathBuf,
    photo: Option<PathBuf>,
    width: u32,
    height: u32,
    options: Option<PathBuf>,
    route_options: Option<PathBuf>,
    units: UnitSystem,
    route: bool,
    watermark: bool,
    watermark_light: Option<PathBuf>,
    watermark_dark: Option<PathBuf>,
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let cfg = parse_args(args)?;

    let raw = decode_activity_file(&cfg.activity).map_err(|e| e.to_string())?;
    let values = format_stats(&raw, cfg.units);
    let options = match &cfg.options {
        Some(path) => {
            OverlayOptions::from_json_str(&read_text(path)?).map_err(|e| e.to_string())?
        }
        None => OverlayOptions::default(),
    };

    let mut canvas = match &cfg.photo {
        Some(path) => {
            let photo = image::open(path)
                .map_err(|e| format!("cannot open photo {}: {}", path.display(), e))?;
            RgbCanvas::from_rgb_image(&photo.to_rgb8())
        }
        None => RgbCanvas::new(cfg.width, cfg.height, Rgb888::new(0x3A, 0x4A, 0x5A)),
    };
    let renderer = EgRenderer::new(EgRenderConfig::default());

    if cfg.route {
        let route_options = match &cfg.route_options {
            Some(path) => {
                RouteOptions::from_json_str(&read_text(path)?).map_err(|e| e.to_string())?
            }
            None => RouteOptions::default(),
        };
        let commands = activity_overlay_render::compose_route(
            &values.route_points,
            canvas.width(),
            canvas.height(),
            &route_options,
        );
        if commands.is_empty() {
            eprintln!("route has too few points or no extent; skipping full-frame route");
        }
        renderer
            .render_commands(&commands, &mut canvas)
            .map_err(|_| "render backend failed".to_string())?;
    }

    let frame = embedded_composer().compose(canvas.width(), canvas.height(), &values, &options);
    let diag = renderer
        .render_commands(&frame.commands, &mut canvas)
        .map_err(|_| "render backend failed".to_string())?;

    if cfg.watermark {
        let logos =
            load_watermark_logos(cfg.watermark_light.as_deref(), cfg.watermark_dark.as_deref());
        let placement = draw_watermark(
            &renderer,
            &mut canvas,
            &logos,
            &options.font_family,
            Some(&frame.result),
        );
        eprintln!("watermark: {:?} at {:?}", placement.corner, placement.rect);
    }

    let out = match &cfg.out {
        Some(path) => path.clone(),
        None => {
            let base = cfg
                .photo
                .as_deref()
                .and_then(Path::file_stem)
                .and_then(|stem| stem.to_str())
                .unwrap_or("overlay");
            PathBuf::from(download_filename(base, &values, "png"))
        }
    };
    canvas
        .to_rgb_image()
        .save(&out)
        .map_err(|e| format!("cannot write {}: {}", out.display(), e))?;

    eprintln!(
        "overlay {}x{} at ({}, {}); {} commands, {} text fallbacks",
        frame.result.width,
        frame.result.height,
        frame.result.x,
        frame.result.y,
        diag.commands,
        diag.text_fallbacks
    );
    println!("{}", out.display());
    Ok(())
}

fn read_text(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    let mut activity = None;
    let mut cfg = Args {
        activity: PathBuf::new(),
        photo: None,
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        options: None,
        route_options: None,
        units: UnitSystem::Metric,
        route: false,
        watermark: true,
        watermark_light: None,
        watermark_dark: None,
        out: None,
    };

    let mut iter = args.into_iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--activity" => activity = Some(PathBuf::from(next_value(&mut iter, &arg)?)),
            "--photo" => cfg.photo = Some(PathBuf::from(next_value(&mut iter, &arg)?)),
            "--width" => cfg.width = parse_dimension(&next_value(&mut iter, &arg)?, &arg)?,
            "--height" => cfg.height = parse_dimension(&next_value(&mut iter, &arg)?, &arg)?,
            "--options" => cfg.options = Some(PathBuf::from(next_value(&mut iter, &arg)?)),
            "--route-options" => {
                cfg.route_options = Some(PathBuf::from(next_value(&mut iter, &arg)?));
                cfg.route = true;
            }
            "--units" => {
                cfg.units = next_value(&mut iter, &arg)?
                    .parse()
                    .map_err(|e: activity_overlay::UnknownUnitSystem| e.to_string())?
            }
            "--route" => cfg.route = true,
            "--no-watermark" => cfg.watermark = false,
            "--watermark-light" => {
                cfg.watermark_light = Some(PathBuf::from(next_value(&mut iter, &arg)?))
            }
            "--watermark-dark" => {
                cfg.watermark_dark = Some(PathBuf::from(next_value(&mut iter, &arg)?))
            }
            "--out" => cfg.out = Some(PathBuf::from(next_value(&mut iter, &arg)?)),
            "-h" | "--help" => return Err("help requested".to_string()),
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    cfg.activity = activity.ok_or_else(|| "--activity is required".to_string())?;
    Ok(cfg)
}

fn next_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    iter.next()
        .ok_or_else(|| format!("missing value for {}", flag))
}

fn parse_dimension(value: &str, flag: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(format!("invalid {} value: {}", flag, value)),
    }
}

fn help_text() -> &'static str {
    "Usage: overlay-preview --activity <file.gpx|file.tcx> [options]\n\
     \n\
     Options:\n\
       --photo <image>            Draw onto a photo (JPEG or PNG)\n\
       --width <px>               Blank canvas width when no photo (default 1600)\n\
       --height <px>              Blank canvas height when no photo (default 1200)\n\
       --options <json>           Overlay options file\n\
       --units <metric|imperial>  Display units (default metric)\n\
       --route                    Draw the full-frame route under the overlay\n\
       --route-options <json>     Route options file (implies --route)\n\
       --watermark-light <png>    Logo for dark backgrounds\n\
       --watermark-dark <png>     Logo for bright backgrounds\n\
       --no-watermark             Skip the watermark\n\
       --out <png>                Output path (default: derived from the activity)\n"
}
