use screenshot_stitch::postprocess::Margins;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Vertical,
    Horizontal,
    Compare,
    Classify { image: PathBuf },
}

#[derive(Debug)]
pub struct Args {
    pub mode: Mode,
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub guides: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub match_pos: Option<u32>,
    pub match_height: Option<u32>,
    pub threshold: Option<f64>,
    pub crop: Option<Margins>,
    pub mask: Option<Margins>,
    pub no_crop: bool,
    pub no_mask: bool,
    pub debug_mode: bool,
}

fn parse_value<T: std::str::FromStr>(flag: &str, val: &str) -> Option<T> {
    match val.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("❌ Invalid value for {}: {}", flag, val);
            None
        }
    }
}

fn parse_margins(flag: &str, val: &str) -> Option<Margins> {
    let margins = Margins::parse(val);
    if margins.is_none() {
        eprintln!("❌ Invalid margins for {} (expected left,top,right,bottom)", flag);
    }
    margins
}

impl Args {
    pub fn parse() -> Option<Self> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse flags and input files (program name already stripped)
    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Option<Self> {
        let mut mode: Option<Mode> = None;
        let mut inputs = Vec::new();
        let mut output = PathBuf::from("merged.png");
        let mut guides = None;
        let mut config_path = None;
        let mut match_pos = None;
        let mut match_height = None;
        let mut threshold = None;
        let mut crop = None;
        let mut mask = None;
        let mut no_crop = false;
        let mut no_mask = false;
        let mut debug_mode = false;

        for arg in args {
            if arg == "--help" || arg == "-h" {
                print_help();
                return None;
            } else if arg == "--version" || arg == "-v" {
                println!(
                    "Screenshot Stitch v{} (semver {}, built {})",
                    env!("APP_VERSION_DISPLAY"),
                    env!("APP_VERSION_SEMVER"),
                    env!("APP_BUILD_YEAR")
                );
                return None;
            } else if arg == "--debug" {
                debug_mode = true;
            } else if arg == "--vertical" {
                mode = Some(Mode::Vertical);
            } else if arg == "--horizontal" {
                mode = Some(Mode::Horizontal);
            } else if arg == "--compare" {
                mode = Some(Mode::Compare);
            } else if let Some(val) = arg.strip_prefix("--classify=") {
                mode = Some(Mode::Classify {
                    image: PathBuf::from(val),
                });
            } else if let Some(val) = arg.strip_prefix("--out=") {
                output = PathBuf::from(val);
            } else if let Some(val) = arg.strip_prefix("--guides=") {
                guides = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--config=") {
                config_path = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--match-pos=") {
                match_pos = Some(parse_value(&arg, val)?);
            } else if let Some(val) = arg.strip_prefix("--match-height=") {
                match_height = Some(parse_value(&arg, val)?);
            } else if let Some(val) = arg.strip_prefix("--threshold=") {
                threshold = Some(parse_value(&arg, val)?);
            } else if let Some(val) = arg.strip_prefix("--crop=") {
                crop = Some(parse_margins(&arg, val)?);
            } else if let Some(val) = arg.strip_prefix("--mask=") {
                mask = Some(parse_margins(&arg, val)?);
            } else if arg == "--no-crop" {
                no_crop = true;
            } else if arg == "--no-mask" {
                no_mask = true;
            } else if arg.starts_with('-') {
                eprintln!("❌ Unknown argument: {}", arg);
                print_help();
                return None;
            } else {
                inputs.push(PathBuf::from(arg));
            }
        }

        let mode = mode.unwrap_or(Mode::Vertical);
        if mode == Mode::Compare && inputs.len() != 2 {
            eprintln!("❌ --compare needs exactly two images, got {}", inputs.len());
            return None;
        }
        if inputs.is_empty() {
            eprintln!("❌ No input images given");
            print_help();
            return None;
        }

        Some(Args {
            mode,
            inputs,
            output,
            guides,
            config_path,
            match_pos,
            match_height,
            threshold,
            crop,
            mask,
            no_crop,
            no_mask,
            debug_mode,
        })
    }
}

fn print_help() {
    println!("🧩 Screenshot Stitch");
    println!();
    println!("USAGE:");
    println!("    screenshot-stitch [FLAGS] <IMAGES>...");
    println!();
    println!("MODES:");
    println!("    --vertical          Auto-stitch scrolling screenshots top to bottom (default)");
    println!("    --horizontal        Join images side by side without matching");
    println!("    --compare           Print the similarity of two images (second fits in first)");
    println!("    --classify=<IMAGE>  Find which of the given pattern images occupies each slot");
    println!();
    println!("FLAGS:");
    println!("    --out=<PATH>        Output PNG (default: merged.png)");
    println!("    --guides=<PATH>     Also write a preview with crop/mask guides");
    println!("    --config=<PATH>     Load settings from a JSON file");
    println!("    --match-pos=N       Match band bottom edge, % of image height (default 79)");
    println!("    --match-height=N    Match band height, % of image height (default 5)");
    println!("    --threshold=F       Classification threshold (default 0.8)");
    println!("    --crop=L,T,R,B      Crop margins in pixels (default 20,312,20,520)");
    println!("    --mask=L,T,R,B      Scrollbar mask margins in pixels (default 1231,1323,29,567)");
    println!("    --no-crop           Skip the post-stitch crop");
    println!("    --no-mask           Skip the scrollbar mask");
    println!("    --debug             Enable debug logging");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    screenshot-stitch shot1.png shot2.png shot3.png --out=page.png");
    println!("    screenshot-stitch --horizontal a.png b.png");
    println!("    screenshot-stitch --compare full.png crop.png");
    println!("    screenshot-stitch --classify=strip.png digit0.png digit1.png digit2.png");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Args> {
        Args::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults_to_vertical() {
        let args = parse(&["a.png", "b.png"]).unwrap();
        assert_eq!(args.mode, Mode::Vertical);
        assert_eq!(args.inputs, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        assert_eq!(args.output, PathBuf::from("merged.png"));
        assert!(!args.no_crop);
    }

    #[test]
    fn test_parses_flags() {
        let args = parse(&[
            "--match-pos=90",
            "--match-height=4",
            "--no-mask",
            "--crop=1,2,3,4",
            "--out=page.png",
            "x.png",
        ])
        .unwrap();
        assert_eq!(args.match_pos, Some(90));
        assert_eq!(args.match_height, Some(4));
        assert!(args.no_mask);
        assert_eq!(args.crop, Some(Margins::new(1, 2, 3, 4)));
        assert_eq!(args.output, PathBuf::from("page.png"));
    }

    #[test]
    fn test_classify_mode() {
        let args = parse(&["--classify=strip.png", "--threshold=0.7", "d0.png"]).unwrap();
        assert_eq!(
            args.mode,
            Mode::Classify {
                image: PathBuf::from("strip.png")
            }
        );
        assert_eq!(args.threshold, Some(0.7));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse(&["--match-pos=abc", "a.png"]).is_none());
        assert!(parse(&["--bogus", "a.png"]).is_none());
        assert!(parse(&["--mask=1,2,3", "a.png"]).is_none());
        assert!(parse(&["--compare", "a.png"]).is_none());
        assert!(parse(&[]).is_none());
    }
}
