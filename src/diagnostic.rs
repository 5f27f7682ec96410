// Copyright 2025 Cornell University
// released under MIT License

use std::io::Write;

use clap::ColorChoice;
use codespan_reporting::diagnostic::{
    Diagnostic as CodespanDiagnostic, Label as CodespanLabel, LabelStyle, Severity,
};
use codespan_reporting::files::{Error as FilesError, Files, SimpleFiles};
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Buffer, Color, ColorSpec, WriteColor};
use log::error;

use crate::errors::ParseError;

/// Severity of diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

/// A label representing a part of a trace
#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    message: Option<String>,
    range: (usize, usize),
}

impl Label {
    fn to_codespan_label(&self, fileid: usize) -> CodespanLabel<usize> {
        CodespanLabel::new(LabelStyle::Primary, fileid, self.range.0..self.range.1)
            .with_message(self.message.clone().unwrap_or_default())
    }
}

/// Diagnostic of a particular part of a trace
struct Diagnostic {
    title: String,
    message: String,
    level: Level,
    location: Option<(usize, Label)>,
}

impl Diagnostic {
    fn emit(&self, buffer: &mut Buffer, files: &SimpleFiles<String, String>) -> Result<(), FilesError> {
        if let Some((fileid, label)) = &self.location {
            let severity = match self.level {
                Level::Error => Severity::Error,
                Level::Warning => Severity::Warning,
            };

            let diagnostic = CodespanDiagnostic::new(severity)
                .with_message(&self.message)
                .with_labels(vec![label.to_codespan_label(*fileid)]);

            let config = term::Config::default();
            term::emit(buffer, &config, files, &diagnostic)
        } else {
            let color = match self.level {
                Level::Error => Color::Red,
                Level::Warning => Color::Yellow,
            };

            buffer.set_color(ColorSpec::new().set_bold(true).set_fg(Some(color)))?;
            write!(buffer, "{}", self.title)?;
            buffer.set_color(&ColorSpec::new())?;
            writeln!(buffer, ": {}", self.message)?;
            Ok(())
        }
    }
}

pub struct DiagnosticHandler {
    files: SimpleFiles<String, String>,
    error_string: String,
    /// whether to emit error messages w/ ANSI colors
    color_choice: ColorChoice,
}

impl Default for DiagnosticHandler {
    /// Default `DiagnosticHandler` does not emit colored error messages
    fn default() -> Self {
        Self::new(ColorChoice::Never)
    }
}

impl DiagnosticHandler {
    pub fn new(color_choice: ColorChoice) -> Self {
        Self {
            files: SimpleFiles::new(),
            error_string: String::new(),
            color_choice,
        }
    }

    fn create_buffer(&self) -> Buffer {
        if self.color_choice == ColorChoice::Never {
            Buffer::no_color()
        } else {
            Buffer::ansi()
        }
    }

    pub fn add_file(&mut self, name: String, content: String) -> usize {
        self.files.add(name, content)
    }

    /// Everything emitted so far.
    pub fn error_string(&self) -> &str {
        &self.error_string
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        let mut buffer = self.create_buffer();
        if let Err(e) = diagnostic.emit(&mut buffer, &self.files) {
            error!("failed to render diagnostic `{}`: {e}", diagnostic.message);
            return;
        }
        let error_msg = String::from_utf8_lossy(buffer.as_slice());
        self.error_string.push_str(&error_msg);
        eprint!("{}", error_msg);
    }

    /// Reports a trace defect, pointing at the offending line when it is known.
    pub fn emit_parse_error(&mut self, fileid: usize, err: &ParseError) {
        let message = err.error.to_string();
        let range = err
            .line
            .and_then(|line| self.files.line_range(fileid, line).ok());
        match range {
            Some(range) => self.emit(Diagnostic {
                title: format!("{:?} in file {}", Level::Error, fileid),
                message,
                level: Level::Error,
                location: Some((
                    fileid,
                    Label {
                        message: Some("while reading this line".to_string()),
                        range: (range.start, range.end),
                    },
                )),
            }),
            None => {
                let name = self
                    .files
                    .get(fileid)
                    .map(|file| file.name().clone())
                    .unwrap_or_default();
                self.emit_general_message(&format!("{name}: {message}"), Level::Error)
            }
        }
    }

    pub fn emit_general_message(&mut self, message: &str, level: Level) {
        self.emit(Diagnostic {
            title: format!("{:?}", level),
            message: message.to_string(),
            level,
            location: None,
        });
    }
}
