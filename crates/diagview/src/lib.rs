#![forbid(unsafe_code)]

//! `diagview` is the headless core of electrical network diagram viewers.
//!
//! The diagram drawing itself is left to a [`session::DiagramRenderer`] supplied by the host;
//! this crate tracks what is displayed and keeps rendered results consistent with it.
//!
//! # Features
//!
//! - `session`: enable selection, parameter store and asynchronous render sessions
//!   (`diagview::session`)

pub use diagview_core::*;

#[cfg(feature = "session")]
pub mod session {
    pub use diagview_session::*;

    use std::path::Path;

    /// Builds a pooled viewer and loads the case file at `path` into it.
    pub fn open_viewer<R: DiagramRenderer>(
        renderer: R,
        path: impl AsRef<Path>,
        config: SessionConfig,
    ) -> Result<Viewer<R>> {
        let mut viewer = Viewer::new(renderer, config)?;
        viewer.load_network_from_path(path)?;
        Ok(viewer)
    }

    /// Turns a container id into a token usable as an SVG `id` prefix.
    ///
    /// Runs of characters outside `[A-Za-z0-9_.]` become a single `-`, and ids that do not
    /// start with a letter get a `d-` prefix. Distinct ids may map to the same token.
    pub fn sanitize_svg_id(raw: &str) -> String {
        let mut token = String::with_capacity(raw.len() + 2);
        for ch in raw.trim().chars() {
            if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.') {
                token.push(ch);
            } else if !token.is_empty() && !token.ends_with('-') {
                token.push('-');
            }
        }
        if token.ends_with('-') {
            token.pop();
        }
        match token.chars().next() {
            None => "d-untitled".to_string(),
            Some(first) if first.is_ascii_alphabetic() => token,
            Some(_) => format!("d-{token}"),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::sanitize_svg_id;

        #[test]
        fn sanitize_svg_id_keeps_plain_ids() {
            assert_eq!(sanitize_svg_id("VL1"), "VL1");
            assert_eq!(sanitize_svg_id(" S1.a_b "), "S1.a_b");
        }

        #[test]
        fn sanitize_svg_id_rewrites_unsupported_characters() {
            assert_eq!(sanitize_svg_id("400 kV / bus#1"), "d-400-kV-bus-1");
            assert_eq!(sanitize_svg_id("  "), "d-untitled");
            assert_eq!(sanitize_svg_id("###"), "d-untitled");
            assert_eq!(sanitize_svg_id("-VL--2-"), "VL-2");
        }

        #[test]
        fn sanitize_svg_id_keeps_single_letter_ids() {
            assert_eq!(sanitize_svg_id("d"), "d");
            assert_eq!(sanitize_svg_id("_x"), "d-_x");
        }
    }
}
