mod cli;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use quizmark_core::bank::{build_question_bank, QuestionGraphic};
use quizmark_core::crop::CropPolicy;
use quizmark_core::editor::{
    EditedImage, EditorConfig, EditorHost, EditorInput, MaskEditor, MaskTool,
};
use quizmark_core::geometry::Size;
use quizmark_core::grading::{GradedItem, GradingResult};
use quizmark_core::pipeline::{self, RenderConfig};
use quizmark_core::session;
use quizmark_core::source::{parse_data_url, ImageSource};
use quizmark_proto::proto::QuizSession;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Mark {
            input,
            output_dir,
            container_width,
            container_height,
            font,
        } => {
            let (items, images) = load_graded_input(&input)?;
            let config = RenderConfig {
                container_width,
                container_height,
                font_path: font,
            };
            let pages = pipeline::render_marked_pages(&items, &images, &config);
            if pages.is_empty() {
                bail!("no pages could be rendered");
            }

            std::fs::create_dir_all(&output_dir).context("failed to create output directory")?;
            for page in &pages {
                let path = output_dir.join(format!("page_{:03}.png", page.index + 1));
                page.image
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            info!(pages = pages.len(), ?output_dir, "marked pages written");
            Ok(())
        }
        cli::Command::Bank {
            input,
            output_dir,
            expansion_factor,
            min_dimension,
        } => {
            let (items, images) = load_graded_input(&input)?;
            let policy = CropPolicy {
                expansion_factor,
                min_dimension,
            };
            let bank = build_question_bank(&items, &images, &policy);
            if bank.entries.is_empty() {
                warn!("no question graphics generated");
            }

            std::fs::create_dir_all(&output_dir).context("failed to create output directory")?;
            let mut listing = Vec::with_capacity(bank.entries.len());
            for (position, entry) in bank.entries.iter().enumerate() {
                let (_, bytes) = parse_data_url(&entry.question_graphic)?;
                let file = bank_file_name(position, &entry.question_number);
                let path = output_dir.join(&file);
                std::fs::write(&path, bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                listing.push(BankFile { file, entry });
            }

            let json = serde_json::to_string_pretty(&listing)
                .context("failed to serialize question bank")?;
            let index = output_dir.join("bank.json");
            std::fs::write(&index, json)
                .with_context(|| format!("failed to write {}", index.display()))?;

            info!(
                generated = bank.entries.len(),
                skipped = bank.skipped.len(),
                ?output_dir,
                "question bank written"
            );
            Ok(())
        }
        cli::Command::Mask {
            input,
            output,
            rects,
            strokes,
            brush_size,
            jpeg_quality,
        } => {
            let bytes = std::fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let file_name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let config = EditorConfig {
                brush_size,
                jpeg_quality,
                ..EditorConfig::default()
            };

            let mut host = CliHost::default();
            let Some(mut editor) = MaskEditor::open(
                EditorInput { file_name, bytes },
                Size::new(800.0, 800.0),
                config,
                &mut host,
            ) else {
                bail!("failed to open {} for masking", input.display());
            };

            editor.set_tool(MaskTool::Rectangle);
            for [a, b] in &rects {
                let (a, b) = (editor.canvas_to_client(*a), editor.canvas_to_client(*b));
                editor.pointer_down(a);
                editor.pointer_move(b);
                editor.pointer_up(b);
            }

            editor.set_tool(MaskTool::Brush);
            for cli::BrushPath(points) in &strokes {
                let client_points = points
                    .iter()
                    .map(|p| editor.canvas_to_client(*p))
                    .collect::<Vec<_>>();
                let Some((first, rest)) = client_points.split_first() else {
                    continue;
                };
                editor.pointer_down(*first);
                for p in rest {
                    editor.pointer_move(*p);
                }
                editor.pointer_up(*rest.last().unwrap_or(first));
            }

            editor.save(&mut host).context("failed to encode masked image")?;
            let Some(edited) = host.saved else {
                bail!("editor produced no image");
            };

            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).context("failed to create output directory")?;
            }
            std::fs::write(&output, &edited.image.bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(
                ?output,
                rects = rects.len(),
                strokes = strokes.len(),
                mime = edited.image.mime(),
                "masked image written"
            );
            Ok(())
        }
        cli::Command::Archive {
            results,
            images,
            output,
        } => {
            let result = read_results(&results, images.len())?;
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .context("system clock is before the Unix epoch")?
                .as_secs() as i64;
            let paths = images
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>();

            let quiz = session::build_session(&result, &paths, timestamp);
            write_session(&quiz, &output)?;
            Ok(())
        }
    }
}

#[derive(Default)]
struct CliHost {
    saved: Option<EditedImage>,
}

impl EditorHost for CliHost {
    fn on_save(&mut self, edited: EditedImage) {
        self.saved = Some(edited);
    }

    fn on_cancel(&mut self) {
        warn!("mask editing cancelled");
    }
}

fn load_graded_input(input: &cli::GradedInput) -> Result<(Vec<GradedItem>, Vec<ImageSource>)> {
    if let Some(path) = &input.session {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let quiz = session::decode_session(&bytes).context("failed to decode session")?;
        return Ok((session::session_items(&quiz), session::session_images(&quiz)));
    }

    let Some(results) = &input.results else {
        bail!("either --results with --images, or --session, is required");
    };
    let images = input
        .images
        .iter()
        .map(|p| ImageSource::Path(p.clone()))
        .collect::<Vec<_>>();
    let result = read_results(results, images.len())?;
    info!(
        questions = result.questions.len(),
        score = result.score,
        total = result.total_questions,
        "loaded grading results"
    );
    Ok((result.questions, images))
}

fn read_results(path: &Path, image_count: usize) -> Result<GradingResult> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    GradingResult::from_json(&json, image_count)
        .with_context(|| format!("invalid grading results in {}", path.display()))
}

/// One `bank.json` record: the graphic's file name next to its entry.
#[derive(Serialize)]
struct BankFile<'a> {
    file: String,
    #[serde(flatten)]
    entry: &'a QuestionGraphic,
}

/// Question numbers restart per section, so the bank position keeps names
/// unique.
fn bank_file_name(position: usize, question_number: &str) -> String {
    format!("question_{:03}_{}.png", position + 1, file_stem(question_number))
}

/// Question numbers become file names; keep them to a safe character set.
fn file_stem(question_number: &str) -> String {
    let stem: String = question_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "unnumbered".into()
    } else {
        stem
    }
}

/// Serialize the session as length-delimited protobuf and write to file.
fn write_session(quiz: &QuizSession, output: &Path) -> Result<()> {
    info!(?output, questions = quiz.questions.len(), "writing quiz session");

    let buf = session::encode_session(quiz);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).context("failed to create output directory")?;
    }

    std::fs::write(output, &buf).with_context(|| format!("failed to write {}", output.display()))?;

    info!(?output, bytes = buf.len(), "quiz session written");
    Ok(())
}
