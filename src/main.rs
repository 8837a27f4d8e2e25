mod args;

use args::{Args, Mode};
use screenshot_stitch::postprocess::{apply_post_processing, draw_guides};
use screenshot_stitch::{
    CoreResult, MatchReport, Pattern, StitchConfig, TemplateMatcher, similarity, stitch_horizontal,
    stitch_vertical,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(args) = Args::parse() else {
        return ExitCode::SUCCESS;
    };

    // Loaded before the logger: debug_enabled sets the default filter
    let config = load_config(&args);
    let default_level = match &config {
        Ok(config) => config.log_level(),
        Err(_) if args.debug_mode => "debug",
        Err(_) => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match config.and_then(|config| run(&args, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> CoreResult<StitchConfig> {
    let mut config = match &args.config_path {
        Some(path) => StitchConfig::load(path)?,
        None => StitchConfig::default(),
    };

    if let Some(pos) = args.match_pos {
        config.match_position_pct = pos;
    }
    if let Some(height) = args.match_height {
        config.match_height_pct = height;
    }
    if let Some(threshold) = args.threshold {
        config.classify_threshold = threshold;
    }
    if let Some(crop) = args.crop {
        config.crop = Some(crop);
    }
    if let Some(mask) = args.mask {
        config.scrollbar_mask = Some(mask);
    }
    if args.no_crop {
        config.crop = None;
    }
    if args.no_mask {
        config.scrollbar_mask = None;
    }
    config.debug_enabled |= args.debug_mode;

    config.validate()?;
    Ok(config)
}

fn load_image(path: &Path) -> CoreResult<image::RgbImage> {
    log::debug!("📂 Loading {}", path.display());
    Ok(image::open(path)?.to_rgb8())
}

fn load_images(paths: &[PathBuf]) -> CoreResult<Vec<image::RgbImage>> {
    paths.iter().map(|p| load_image(p)).collect()
}

fn save_image(image: &image::RgbImage, path: &Path) -> CoreResult<()> {
    image.save(path)?;
    println!(
        "✅ Saved {}x{} image to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

fn run(args: &Args, config: &StitchConfig) -> CoreResult<()> {
    match &args.mode {
        Mode::Vertical => {
            let images = load_images(&args.inputs)?;
            let band = config.band_for_height(images[0].height());
            println!(
                "🧩 Stitching {} images, match band rows [{}, {})",
                images.len(),
                band.start(),
                band.position
            );

            let plan = stitch_vertical(&images, band)?;
            for (i, y) in plan.matched_ys().iter().enumerate() {
                println!("  {} → {}: band found at y={}", i, i + 1, y);
            }

            if let Some(guides_path) = &args.guides {
                save_image(&draw_guides(plan.image(), config), guides_path)?;
            }
            let processed = apply_post_processing(plan.image(), config)?;
            save_image(&processed, &args.output)
        }
        Mode::Horizontal => {
            let images = load_images(&args.inputs)?;
            let merged = stitch_horizontal(&images, config.background_color()?)?;
            save_image(&merged, &args.output)
        }
        Mode::Compare => {
            let image_a = load_image(&args.inputs[0])?;
            let image_b = load_image(&args.inputs[1])?;
            let score = similarity(&image_a, &image_b)?;
            println!("{:.6}", score);
            Ok(())
        }
        Mode::Classify { image } => {
            let target = load_image(image)?;
            let mut matcher = TemplateMatcher::new();
            for path in &args.inputs {
                let label = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string);
                matcher.add_pattern(Pattern::new(label, load_image(path)?));
            }

            let mut matches = matcher.classify(&target, config.classify_threshold)?;
            matches.sort_by_key(|m| (m.y, m.x));

            let report: Vec<MatchReport> = matches
                .iter()
                .map(|m| m.report(matcher.patterns()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
