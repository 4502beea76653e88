//! Server-rendered HTML pages.

use std::fmt::Write as _;

use crate::detect::{Detection, ImageAnalysis};
use crate::video::{Verdict, VideoAnalysis};

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;padding:0 1em;color:#222}\
h1{font-size:1.6em}\
.error{background:#fde8e8;border:1px solid #e0a0a0;padding:.8em;margin:1em 0}\
.alert{background:#fde8e8;border:2px solid #c00;padding:.8em;font-weight:bold}\
.clear{background:#e8f6e8;border:2px solid #080;padding:.8em;font-weight:bold}\
.pair{display:flex;gap:1em;flex-wrap:wrap}\
.pair figure{margin:0;flex:1 1 300px}\
img,video{max-width:100%}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.3em .6em;text-align:left}\
.frame{border-top:1px solid #ddd;padding:1em 0}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = html_escape(title),
        body = body
    )
}

/// Upload form, with an optional error message above it.
pub fn render_index(error: Option<&str>) -> String {
    let mut body = String::from("<h1>Drowning Detection</h1>\n");
    if let Some(error) = error {
        let _ = writeln!(body, "<div class=\"error\">{}</div>", html_escape(error));
    }
    body.push_str(
        "<p>Upload an image or a video (mp4, avi, mov, mkv, wmv) to check for people in distress.</p>\n\
<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
<input type=\"file\" name=\"file\" accept=\"image/*,video/*\">\n\
<button type=\"submit\">Analyze</button>\n\
</form>\n",
    );
    page("Drowning Detection", &body)
}

pub fn render_image_result(upload_filename: &str, analysis: &ImageAnalysis) -> String {
    let mut body = String::from("<h1>Image Result</h1>\n");
    if analysis.drowning_detected() {
        body.push_str("<div class=\"alert\">Drowning detected</div>\n");
    } else {
        body.push_str("<div class=\"clear\">No drowning detected</div>\n");
    }
    let _ = write!(
        body,
        "<div class=\"pair\">\n<figure><img src=\"/uploads/{}\" alt=\"original\"><figcaption>Original</figcaption></figure>\n\
<figure><img src=\"/results/{}\" alt=\"result\"><figcaption>Detections</figcaption></figure>\n</div>\n",
        html_escape(upload_filename),
        html_escape(&analysis.result_filename)
    );
    body.push_str("<h2>Detections</h2>\n");
    body.push_str(&detection_table(&analysis.detections));
    body.push_str("<p><a href=\"/\">Analyze another file</a></p>\n");
    page("Image Result", &body)
}

pub fn render_video_result(upload_filename: &str, analysis: &VideoAnalysis) -> String {
    let summary = &analysis.summary;
    let mut body = String::from("<h1>Video Result</h1>\n");
    let class = match summary.final_prediction {
        Verdict::DrowningDetected => "alert",
        Verdict::NoDrowningDetected => "clear",
    };
    let _ = writeln!(
        body,
        "<div class=\"{}\">{} ({:.1}% confidence)</div>",
        class,
        summary.final_prediction.as_str(),
        summary.confidence_level
    );
    let _ = write!(
        body,
        "<video src=\"/uploads/{}\" controls></video>\n\
<table>\n<tr><th>Frames analyzed</th><td>{}</td></tr>\n\
<tr><th>Frames with drowning</th><td>{}</td></tr>\n\
<tr><th>Video id</th><td>{}</td></tr>\n</table>\n",
        html_escape(upload_filename),
        summary.total_frames_analyzed,
        summary.drowning_frames,
        html_escape(&summary.video_id)
    );
    if summary.frame_limit_reached {
        body.push_str("<p>Frame limit reached; only the beginning of the video was analyzed.</p>\n");
    }

    if analysis.frames.is_empty() {
        body.push_str("<p>No frames could be analyzed.</p>\n");
    }
    for frame in &analysis.frames {
        let _ = write!(
            body,
            "<div class=\"frame\">\n<h3>Frame {}</h3>\n<div class=\"pair\">\n\
<figure><img src=\"/frames/{}/{}\" alt=\"frame {}\"></figure>\n\
<figure><img src=\"/results/{}\" alt=\"frame {} detections\"></figure>\n</div>\n",
            frame.frame_number,
            html_escape(&summary.video_id),
            html_escape(&frame.original_frame),
            frame.frame_number,
            html_escape(&frame.result_frame),
            frame.frame_number
        );
        body.push_str(&detection_table(&frame.detections));
        body.push_str("</div>\n");
    }
    body.push_str("<p><a href=\"/\">Analyze another file</a></p>\n");
    page("Video Result", &body)
}

fn detection_table(detections: &[Detection]) -> String {
    if detections.is_empty() {
        return "<p>No objects detected.</p>\n".to_string();
    }
    let mut table = String::from("<table>\n<tr><th>Class</th><th>Confidence</th></tr>\n");
    for detection in detections {
        let _ = writeln!(
            table,
            "<tr><td>{}</td><td>{:.2}</td></tr>",
            detection.class.label(),
            detection.confidence
        );
    }
    table.push_str("</table>\n");
    table
}

pub fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
