//! YouTube transcript source.
//!
//! Fetches caption tracks (uploaded or automatic) with yt-dlp and flattens the
//! WebVTT cues into plain text.

use super::SourceDocument;
use crate::error::{Result, SporError};
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// YouTube caption source.
pub struct YoutubeSource {
    video_id_regex: Regex,
    caption_lang: String,
}

impl YoutubeSource {
    pub fn new() -> Self {
        // Matches various YouTube URL formats and bare video IDs
        let video_id_regex = Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/
                  |youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("video id pattern is valid");

        Self {
            video_id_regex,
            caption_lang: "en".to_string(),
        }
    }

    /// Set the caption language to request.
    pub fn with_caption_lang(mut self, lang: &str) -> Self {
        self.caption_lang = lang.to_string();
        self
    }

    /// Extract video ID from a YouTube URL or bare ID.
    pub fn extract_video_id(&self, input: &str) -> Option<String> {
        let caps = self.video_id_regex.captures(input.trim())?;

        // Try group 1 (URL format) then group 2 (bare ID)
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }

    /// Download the caption track for a video and return its text.
    #[instrument(skip(self))]
    pub async fn fetch_transcript(&self, url: &str) -> Result<SourceDocument> {
        let video_id = self.extract_video_id(url).ok_or_else(|| {
            SporError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", url))
        })?;

        let temp_dir = tempfile::tempdir()?;
        let template = temp_dir.path().join(format!("{}.%(ext)s", video_id));
        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);

        info!("Fetching captions for {}", video_id);

        let result = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs").arg(&self.caption_lang)
            .arg("--sub-format").arg("vtt")
            .arg("--output").arg(template.to_string_lossy().as_ref())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(&watch_url)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SporError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(SporError::SourceLoad(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SporError::SourceLoad(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let caption_path = find_caption_file(temp_dir.path())?.ok_or_else(|| {
            SporError::SourceLoad(format!(
                "No '{}' captions available for video {}",
                self.caption_lang, video_id
            ))
        })?;

        let vtt = std::fs::read_to_string(&caption_path)?;
        let text = parse_vtt(&vtt);
        debug!("Transcript for {} has {} characters", video_id, text.chars().count());

        Ok(SourceDocument::new(video_id, text))
    }
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Locates the downloaded caption file.
fn find_caption_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "vtt"))
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

/// Flatten a WebVTT document into plain transcript text.
///
/// Keeps cue payload lines only, strips inline tags and entities, and drops
/// lines repeated back to back (automatic captions roll each line twice).
pub fn parse_vtt(vtt: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (i, block) in vtt_blocks(vtt).iter().enumerate() {
        if i == 0 && block[0].starts_with("WEBVTT") {
            continue;
        }
        if ["NOTE", "STYLE", "REGION"]
            .iter()
            .any(|kw| block[0] == *kw || block[0].starts_with(&format!("{} ", kw)))
        {
            continue;
        }

        // An optional cue identifier sits before the timing line.
        let Some(timing) = block.iter().position(|line| line.contains("-->")) else {
            continue;
        };

        for line in &block[timing + 1..] {
            let text = decode_entities(&strip_tags(line));
            let text = text.trim();
            if text.is_empty() || lines.last().is_some_and(|last| last == text) {
                continue;
            }
            lines.push(text.to_string());
        }
    }

    lines.join(" ")
}

/// Split into blocks of non-blank lines.
fn vtt_blocks(vtt: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in vtt.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Resolve named and numeric character references. Text with a stray `&`
/// is kept as is.
fn decode_entities(text: &str) -> String {
    match unescape_with(text, resolve_html5_entity) {
        Ok(decoded) => decoded.replace('\u{a0}', " "),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let source = YoutubeSource::new();

        assert_eq!(
            source.extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("https://youtube.com/shorts/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            source.extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );

        assert_eq!(source.extract_video_id("not-a-video-id"), None);
        assert_eq!(source.extract_video_id(""), None);
    }

    #[test]
    fn test_parse_vtt() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n\
NOTE generated\nby a tool\n\n\
1\n00:00:00.000 --> 00:00:02.000\nThe sky is <c>blue</c>.\n\n\
2\n00:00:02.000 --> 00:00:04.000 align:start position:0%\nThe sky is blue.\nFish &amp; chips\n\n";

        assert_eq!(parse_vtt(vtt), "The sky is blue. Fish & chips");
    }

    #[test]
    fn test_parse_vtt_auto_caption_rollup() {
        let vtt = "WEBVTT\n\n\
00:00:00.000 --> 00:00:01.000\nhello<00:00:00.500><c> world</c>\n\n\
00:00:01.000 --> 00:00:01.010\nhello world\n\n\
00:00:01.010 --> 00:00:03.000\nhello world\nhow are<00:00:02.000><c> you</c>\n";

        assert_eq!(parse_vtt(vtt), "hello world how are you");
    }

    #[test]
    fn test_parse_vtt_keeps_numeric_caption_lines() {
        let vtt = "WEBVTT\n\n\
1\n00:00:00.000 --> 00:00:02.000\nThe answer is\n\n\
2\n00:00:02.000 --> 00:00:04.000\n42\n";

        assert_eq!(parse_vtt(vtt), "The answer is 42");
    }

    #[test]
    fn test_parse_vtt_keeps_keyword_lines_inside_cues() {
        let vtt = "WEBVTT\n\n\
00:00:00.000 --> 00:00:02.000\nNOTE the date\nit is important\n\n\
STYLE\n::cue { color: red }\n\n\
00:00:02.000 --> 00:00:04.000\nREGION one\n";

        assert_eq!(parse_vtt(vtt), "NOTE the date it is important REGION one");
    }

    #[test]
    fn test_parse_vtt_decodes_numeric_entities() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:02.000\n\
                   it&#8217;s&nbsp;&lt;fine&gt; &#x263A;\nQ&A time\n";

        assert_eq!(parse_vtt(vtt), "it\u{2019}s <fine> \u{263a} Q&A time");
    }

    #[test]
    fn test_parse_empty_vtt() {
        assert_eq!(parse_vtt("WEBVTT\n\n"), "");
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_running_tools() {
        let source = YoutubeSource::new();
        let result = source.fetch_transcript("https://example.com/video").await;
        assert!(matches!(result, Err(SporError::InvalidInput(_))));
    }
}
