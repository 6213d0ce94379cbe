// CLI command implementations
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::Engine;
use serde::Serialize;
use tracing::info;

use oxitag::{
    AudioFormat, CoverArt, ImageFormat, NoCoverArt, StaticCoverArt, TagOptions, Tagger,
    TrackMetadata,
};

use crate::cli::config::{Commands, Config};
use crate::cli::output::OutputFormatter;

/// Execute the parsed command line
pub fn run(config: &Config) -> Result<()> {
    let formatter = OutputFormatter::new(config.format, config.quiet);
    let tagger = Tagger::new(load_options(config.config.as_deref())?);

    match &config.command {
        Commands::Read { files, with_cover } => command_read(files, *with_cover, &tagger, &formatter),
        Commands::Detect { files } => command_detect(files, &formatter),
        Commands::Tag {
            file,
            metadata,
            from_file,
            cover,
            hint,
            output,
        } => command_tag(
            file,
            metadata.as_deref(),
            from_file.as_deref(),
            cover.as_deref(),
            hint.as_deref(),
            output.as_deref(),
            &tagger,
            &formatter,
        ),
        Commands::ExportCover { file, output } => command_export_cover(file, output, &tagger, &formatter),
    }
}

fn load_options(path: Option<&Path>) -> Result<TagOptions> {
    let Some(path) = path else {
        return Ok(TagOptions::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    TagOptions::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

/// Expand glob patterns; plain paths are kept as given
fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let entries = glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        let before = paths.len();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable glob entry"),
            }
        }
        if paths.len() == before {
            tracing::warn!(pattern = pattern.as_str(), "glob matched no files");
        }
    }
    Ok(paths)
}

#[derive(Serialize)]
struct CoverOutput<'a> {
    #[serde(flatten)]
    cover: &'a CoverArt,
    /// Image bytes, base64
    data: String,
}

#[derive(Serialize)]
struct ReadOutput<'a> {
    file: String,
    format: AudioFormat,
    metadata: TrackMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<CoverOutput<'a>>,
}

/// Read metadata from files
fn command_read(
    files: &[String],
    with_cover: bool,
    tagger: &Tagger,
    formatter: &OutputFormatter,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for path in expand_paths(files)? {
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                formatter.print_error(&format!("{}: {}", path.display(), e));
                continue;
            }
        };
        let filename = path.to_string_lossy();
        let cover = if with_cover { tagger.read_cover_art(&bytes) } else { None };
        let output = ReadOutput {
            file: filename.to_string(),
            format: AudioFormat::detect(&bytes, None),
            metadata: tagger.read_track_metadata(&bytes, &filename),
            cover: cover.as_ref().map(|cover| CoverOutput {
                cover,
                data: base64::engine::general_purpose::STANDARD.encode(&cover.data),
            }),
        };
        formatter.output(&output, &mut stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Detect file format
fn command_detect(files: &[String], formatter: &OutputFormatter) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for path in expand_paths(files)? {
        match fs::read(&path) {
            Ok(bytes) => {
                let format = AudioFormat::detect(&bytes, None);
                let format = match format {
                    AudioFormat::Unknown => AudioFormat::from_filename(&path.to_string_lossy()),
                    format => format,
                };
                formatter.output(
                    &serde_json::json!({ "file": path.to_string_lossy(), "format": format }),
                    &mut stdout,
                )?;
            }
            Err(e) => formatter.print_error(&format!("{}: {}", path.display(), e)),
        }
    }
    Ok(())
}

/// Write metadata into one file
#[allow(clippy::too_many_arguments)]
fn command_tag(
    file: &Path,
    metadata: Option<&str>,
    from_file: Option<&Path>,
    cover: Option<&Path>,
    hint: Option<&str>,
    output: Option<&Path>,
    tagger: &Tagger,
    formatter: &OutputFormatter,
) -> Result<()> {
    let metadata_json = match (metadata, from_file) {
        (Some(json), _) => json.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata from {}", path.display()))?,
        (None, None) => bail!("No metadata given; use --metadata or --from-file"),
    };
    let mut metadata: TrackMetadata =
        serde_json::from_str(&metadata_json).context("Invalid metadata JSON")?;

    let audio = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let tagged = match cover {
        Some(cover_path) => {
            let image = fs::read(cover_path)
                .with_context(|| format!("Failed to read cover {}", cover_path.display()))?;
            if metadata.cover_id.is_none() {
                metadata.cover_id = Some(cover_path.to_string_lossy().into_owned());
            }
            tagger.add_metadata_to_audio(&audio, &metadata, &StaticCoverArt(image), hint)
        }
        None => tagger.add_metadata_to_audio(&audio, &metadata, &NoCoverArt, hint),
    };

    let changed = tagged != audio;
    if !changed {
        formatter.print_info(&format!("{} left unchanged (see log for the reason)", file.display()));
        if output.is_none() {
            return Ok(());
        }
    }

    let target = output.unwrap_or(file);
    fs::write(target, &tagged).with_context(|| format!("Failed to write {}", target.display()))?;
    info!(file = %target.display(), bytes = tagged.len(), changed, "wrote output file");
    let summary = tag_summary(target, changed);
    if changed {
        formatter.print_success(&summary);
    } else {
        formatter.print_info(&summary);
    }
    Ok(())
}

fn tag_summary(target: &Path, changed: bool) -> String {
    if changed {
        format!("Updated metadata for {}", target.display())
    } else {
        format!("Copied untagged audio to {}", target.display())
    }
}

/// Export cover art
fn command_export_cover(
    file: &Path,
    output: &Path,
    tagger: &Tagger,
    formatter: &OutputFormatter,
) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let Some(cover) = tagger.read_cover_art(&bytes) else {
        bail!("{} has no embedded cover art", file.display());
    };

    let format = match ImageFormat::from_mime(&cover.mime_type) {
        ImageFormat::Unknown => ImageFormat::detect(&cover.data),
        format => format,
    };
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let target = output.join(format!("cover.{}", format.extension()));
    fs::write(&target, &cover.data).with_context(|| format!("Failed to write {}", target.display()))?;

    formatter.print_success(&format!(
        "Exported {} ({} bytes) to {}",
        cover.mime_type,
        cover.data.len(),
        target.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::OutputFormat;

    #[test]
    fn plain_paths_are_not_globbed() {
        let paths = expand_paths(&["does/not/exist.flac".to_string()]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("does/not/exist.flac")]);
    }

    #[test]
    fn bad_glob_is_an_error() {
        assert!(expand_paths(&["[".to_string()]).is_err());
    }

    #[test]
    fn untaggable_file_is_copied_without_success_line() {
        let dir = std::env::temp_dir().join(format!("oxitag-tag-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.ogg");
        let output = dir.join("out.ogg");
        fs::write(&input, b"OggS\0\0\0\0").unwrap();

        command_tag(
            &input,
            Some(r#"{"title": "T"}"#),
            None,
            None,
            None,
            Some(output.as_path()),
            &Tagger::default(),
            &OutputFormatter::new(OutputFormat::Json, true),
        )
        .unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"OggS\0\0\0\0");
        assert_eq!(
            tag_summary(&output, false),
            format!("Copied untagged audio to {}", output.display())
        );
        assert!(tag_summary(&output, true).starts_with("Updated metadata for"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_options(None).unwrap(), TagOptions::default());
    }
}
