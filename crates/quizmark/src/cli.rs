use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quizmark_core::editor::Point;

#[derive(Parser)]
#[command(
    name = "quizmark",
    about = "Marks graded quiz photos and redacts regions before regrading"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where graded results and their page images come from.
#[derive(Args)]
pub struct GradedInput {
    /// Grading response JSON.
    #[arg(long, requires = "images", conflicts_with = "session")]
    pub results: Option<PathBuf>,

    /// Page images, in the order the grading model saw them.
    #[arg(long, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// A saved quiz session (length-delimited protobuf) instead of
    /// results + images.
    #[arg(long)]
    pub session: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render every page with its marking overlays.
    Mark {
        #[command(flatten)]
        input: GradedInput,

        /// Directory to write page_NNN.png files into.
        #[arg(short, long)]
        output_dir: PathBuf,

        #[arg(long, default_value_t = 800)]
        container_width: u32,

        #[arg(long, default_value_t = 1000)]
        container_height: u32,

        /// Font used for correct-answer tags.
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Crop a picture of every question that has a correct answer.
    Bank {
        #[command(flatten)]
        input: GradedInput,

        /// Directory to write question_<n>.png and bank.json into.
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Padding added on each side, as a fraction of the box size.
        #[arg(long, default_value_t = 0.3)]
        expansion_factor: f64,

        /// Minimum box width/height in pixels before padding.
        #[arg(long, default_value_t = 10.0)]
        min_dimension: f64,
    },

    /// Paint white masks over an image and save it in its original format.
    Mask {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Rectangle mask in image pixels: x0,y0,x1,y1. Repeatable.
        #[arg(long = "rect", value_parser = parse_rect)]
        rects: Vec<[Point; 2]>,

        /// Brush stroke through image pixel points: x0,y0,x1,y1,... Repeatable.
        #[arg(long = "brush", value_parser = parse_stroke)]
        strokes: Vec<BrushPath>,

        #[arg(long, default_value_t = 30.0)]
        brush_size: f64,

        #[arg(long, default_value_t = 95)]
        jpeg_quality: u8,
    },

    /// Save results and page paths as a quiz session.
    Archive {
        #[arg(long)]
        results: PathBuf,

        #[arg(long, num_args = 1.., required = true)]
        images: Vec<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct BrushPath(pub Vec<Point>);

fn parse_points(s: &str) -> Result<Vec<Point>, String> {
    let values = s
        .split(',')
        .map(|v| match v.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            Ok(_) => Err(format!("coordinate {v:?} is not finite")),
            Err(e) => Err(format!("invalid coordinate {v:?}: {e}")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() % 2 != 0 {
        return Err(format!("expected x,y pairs, got {} values", values.len()));
    }
    Ok(values.chunks(2).map(|p| Point::new(p[0], p[1])).collect())
}

fn parse_rect(s: &str) -> Result<[Point; 2], String> {
    match parse_points(s)?.as_slice() {
        [a, b] => Ok([*a, *b]),
        _ => Err("expected x0,y0,x1,y1".into()),
    }
}

fn parse_stroke(s: &str) -> Result<BrushPath, String> {
    let points = parse_points(s)?;
    if points.len() < 2 {
        return Err("a brush stroke needs at least two points".into());
    }
    Ok(BrushPath(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rect_corners() {
        let [a, b] = parse_rect("10, 20,30,40.5").unwrap();
        assert_eq!(a, Point::new(10.0, 20.0));
        assert_eq!(b, Point::new(30.0, 40.5));
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,3,4,5,6").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
        assert!(parse_stroke("5,5").is_err());
        assert!(parse_stroke("50,50,inf,50").is_err());
        assert!(parse_rect("0,0,NaN,10").is_err());
    }

    #[test]
    fn parses_brush_path() {
        let BrushPath(points) = parse_stroke("0,0,10,0,10,10").unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Point::new(10.0, 10.0));
    }

    #[test]
    fn results_and_session_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "quizmark",
            "mark",
            "--results",
            "r.json",
            "--images",
            "a.jpg",
            "--session",
            "s.pb",
            "-o",
            "out",
        ]);
        assert!(parsed.is_err());
    }
}
