//! Terminal frontend and the local marker-stream endpoint.
//!
//! The windowing and dialog toolkits are external collaborators; this module
//! is the minimal operator surface standing in for them: prompts go to
//! stdout, grid presses and slider ratings come from stdin. Input lines are
//! pulled off a reader thread, so the response window is polled one frame at
//! a time and a configured response timeout stays live while waiting for a
//! press. Typing the quit word at any prompt tears the session down, the
//! console equivalent of the global quit keypress.

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use emogrid_core::{GridResponse, ImageStimulus, MarkerOutlet, StreamIdentity};
use emogrid_timing::{SessionTimer, Timer};

/// Outcome of one response-window poll.
pub enum PressPoll {
    Press(GridResponse),
    /// No qualifying press arrived within the wait.
    Pending,
    Quit,
}

pub struct Console {
    quit_word: &'static str,
    lines: Receiver<io::Result<String>>,
}

impl Console {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            quit_word: "quit",
            lines: rx,
        }
    }

    /// One line of input; `None` means the operator quit (or stdin closed).
    fn prompt(&self, text: &str) -> Result<Option<String>> {
        print!("{text}");
        io::stdout().flush()?;
        let line = match self.lines.recv() {
            Ok(line) => line?,
            Err(_) => return Ok(None),
        };
        let line = line.trim().to_string();
        if line.eq_ignore_ascii_case(self.quit_word) {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Blocks until the operator presses Enter. False means quit.
    pub fn wait_continue(&self, message: &str) -> Result<bool> {
        println!("\n{message}");
        Ok(self.prompt("Press Enter to continue: ")?.is_some())
    }

    pub fn show_text(&self, text: &str) {
        println!("\n    {text}");
    }

    pub fn show_fixation(&self) {
        println!("\n    +");
    }

    pub fn show_image(&self, image: &ImageStimulus) {
        println!("\n    [IMAGE] {}", image.path.display());
    }

    pub fn show_confirmation(&self, response: &GridResponse) {
        println!(
            "\n    [EMOJIGRID] marked at ({}, {})",
            response.valence, response.arousal
        );
    }

    /// Movie playback itself is external; the console just holds the session
    /// until the operator reports it finished.
    pub fn play_movie(&self, path: &Path) -> Result<bool> {
        println!("\n    [MOVIE] {}", path.display());
        Ok(self
            .prompt("Press Enter when the movie has finished: ")?
            .is_some())
    }

    /// Operator intake dialog. Fixed fields are shown read-only; the rest
    /// are free-form. `None` means the dialog was cancelled.
    pub fn intake(
        &self,
        fixed: &[(String, String)],
        fields: &[&str],
    ) -> Result<Option<Vec<(String, String)>>> {
        println!("\n=== Participant Information ===");
        for (field, value) in fixed {
            println!("{field}: {value}");
        }
        let mut answers = Vec::with_capacity(fields.len());
        for field in fields {
            match self.prompt(&format!("{field}: "))? {
                Some(answer) => answers.push((field.to_string(), answer)),
                None => return Ok(None),
            }
        }
        Ok(Some(answers))
    }

    /// Visual-analog scale: a free position between two labeled extremes,
    /// in [-max, max].
    pub fn vas(&self, question: &str, labels: [&str; 2], max: f64) -> Result<Option<f64>> {
        println!("\n{question}");
        println!("({} = {}, {} = {})", -max, labels[0], max, labels[1]);
        loop {
            let Some(line) = self.prompt("Rating: ")? else {
                return Ok(None);
            };
            match line.parse::<f64>() {
                Ok(value) if (-max..=max).contains(&value) => return Ok(Some(value)),
                _ => println!("Please enter a number between {} and {}.", -max, max),
            }
        }
    }

    /// Seven-point agreement rating in -3..=3.
    pub fn likert(&self, statement: &str) -> Result<Option<i32>> {
        println!("\n{statement}");
        println!("(-3 = Strongly disagree ... 3 = Strongly agree)");
        loop {
            let Some(line) = self.prompt("Rating: ")? else {
                return Ok(None);
            };
            match line.parse::<i32>() {
                Ok(value) if (-3..=3).contains(&value) => return Ok(Some(value)),
                _ => println!("Please enter a whole number between -3 and 3."),
            }
        }
    }

    /// Opens the response window on screen. Presses are then collected with
    /// [`Console::poll_press`], one frame at a time.
    pub fn open_grid(&self) {
        println!("\n    [EMOJIGRID] click a position: valence arousal, each in [-1, 1]");
        print!("Position: ");
        let _ = io::stdout().flush();
    }

    /// Waits up to `wait` for the next qualifying press. Presses outside the
    /// [-1, 1] square do not qualify and leave the window open, exactly like
    /// clicks outside the on-screen grid box. Reaction time runs from
    /// `opened`, the timestamp taken when the window was shown.
    pub fn poll_press(
        &self,
        timer: &SessionTimer,
        opened: u64,
        wait: Duration,
    ) -> Result<PressPoll> {
        let line = match self.lines.recv_timeout(wait) {
            Ok(line) => line?,
            Err(RecvTimeoutError::Timeout) => return Ok(PressPoll::Pending),
            Err(RecvTimeoutError::Disconnected) => return Ok(PressPoll::Quit),
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case(self.quit_word) {
            return Ok(PressPoll::Quit);
        }
        match parse_press(line) {
            Some((valence, arousal)) => Ok(PressPoll::Press(GridResponse {
                valence,
                arousal,
                reaction_secs: timer.elapsed(opened).as_secs_f64(),
            })),
            None => {
                print!("Position: ");
                io::stdout().flush()?;
                Ok(PressPoll::Pending)
            }
        }
    }
}

/// Parses a "valence arousal" line; both must land inside the grid box.
fn parse_press(line: &str) -> Option<(f64, f64)> {
    let mut parts = line.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(valence)), Some(Ok(arousal)), None)
            if (-1.0..=1.0).contains(&valence) && (-1.0..=1.0).contains(&arousal) =>
        {
            Some((valence, arousal))
        }
        _ => None,
    }
}

/// Local endpoint of the marker stream: one `code<TAB>timestamp_ns` line per
/// sample, appended as events happen. The stream identity is recorded in the
/// header so downstream tooling can match it to the live stream.
pub struct FileOutlet {
    out: BufWriter<File>,
    start: Instant,
}

impl FileOutlet {
    pub fn create(path: &Path, identity: &StreamIdentity) -> io::Result<Self> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(
            out,
            "# stream name={} type={} channels={} format={} source={}",
            identity.name,
            identity.stream_type,
            identity.channel_count,
            identity.channel_format,
            identity.source_id
        )?;
        Ok(Self {
            out,
            start: Instant::now(),
        })
    }
}

impl MarkerOutlet for FileOutlet {
    fn push_sample(&mut self, code: i32) {
        let ns = self.start.elapsed().as_nanos();
        if let Err(e) = writeln!(self.out, "{code}\t{ns}").and_then(|_| self.out.flush()) {
            eprintln!("[WARNING] - marker sample {code} not written: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presses_qualify_only_inside_the_grid_box() {
        assert_eq!(parse_press("0.5 -0.25"), Some((0.5, -0.25)));
        assert_eq!(parse_press("1 1"), Some((1.0, 1.0)));
        assert_eq!(parse_press("-1 -1"), Some((-1.0, -1.0)));
        assert_eq!(parse_press("1.5 0"), None);
        assert_eq!(parse_press("0 -2"), None);
        assert_eq!(parse_press("0.5"), None);
        assert_eq!(parse_press("a b"), None);
        assert_eq!(parse_press("0 0 0"), None);
    }
}
