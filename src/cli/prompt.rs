//! Interactive prompts
//!
//! Generic over the reader and writer so sessions can be driven from tests.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use super::CliError;
use crate::downloader::config::{output_dir_or_default, DEFAULT_OUTPUT_DIR};
use crate::Album;

/// Why an album selection was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Input is not a number
    NotANumber,
    /// Number outside `1..=count`
    OutOfRange {
        /// Number of albums offered
        count: usize,
    },
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotANumber => write!(f, "Please enter a valid number"),
            Self::OutOfRange { count } => write!(f, "Please enter a number between 1 and {count}"),
        }
    }
}

/// Parse a 1-based album number into a 0-based index
pub fn parse_selection(input: &str, count: usize) -> Result<usize, SelectionError> {
    let number: i64 = input
        .trim()
        .parse()
        .map_err(|_| SelectionError::NotANumber)?;
    if number < 1 || number as u64 > count as u64 {
        return Err(SelectionError::OutOfRange { count });
    }
    Ok(number as usize - 1)
}

/// One line per album, numbered from 1
pub fn format_album_line(index: usize, album: &Album) -> String {
    format!("{}. {} (ID: {})", index + 1, album.title, album.id)
}

/// Question-and-answer terminal I/O
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Prompt on `output`, reading answers from `input`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writer used for prompts and messages
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Print a line of output
    pub fn say(&mut self, line: impl AsRef<str>) -> Result<(), CliError> {
        writeln!(self.output, "{}", line.as_ref())?;
        Ok(())
    }

    /// Ask `question` and return the trimmed answer
    pub fn ask(&mut self, question: &str) -> Result<String, CliError> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(CliError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Account email, re-asked until non-empty
    pub fn email(&mut self) -> Result<String, CliError> {
        loop {
            let email = self.ask("Enter your Google email address: ")?;
            if !email.is_empty() {
                return Ok(email);
            }
        }
    }

    /// Print `albums` and ask for one until a valid number is given.
    /// Returns the 0-based index.
    pub fn select_album(&mut self, albums: &[Album]) -> Result<usize, CliError> {
        self.say("\nAvailable albums:")?;
        for (index, album) in albums.iter().enumerate() {
            self.say(format_album_line(index, album))?;
        }

        loop {
            let answer = self.ask("\nEnter the number of the album you want to download: ")?;
            match parse_selection(&answer, albums.len()) {
                Ok(index) => return Ok(index),
                Err(e) => self.say(e.to_string())?,
            }
        }
    }

    /// Output directory, defaulting to `./downloads` on an empty answer
    pub fn output_dir(&mut self) -> Result<PathBuf, CliError> {
        let answer = self.ask(&format!(
            "Enter the output directory path (default: {DEFAULT_OUTPUT_DIR}): "
        ))?;
        Ok(output_dir_or_default(&answer))
    }
}
