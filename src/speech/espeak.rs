//! [`SpeechPlatform`] backed by the `espeak-ng` command-line synthesizer.
//!
//! Voices come from `espeak-ng --voices`; the voice file (e.g. `gmw/en-US`)
//! is the identifier.  Text is written to the child's stdin so that input
//! starting with `-` is never taken for an option.  An asynchronous request
//! is the running child process; its status is read with `try_wait`.

use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::platform::{PlatformError, RunState, SpeechPlatform, Voice};

/// Language espeak-ng speaks when no voice is given.
const ESPEAK_DEFAULT_LANGUAGE: &str = "en";

pub struct EspeakPlatform {
    program: String,
    voice: Mutex<Option<String>>,
    child: Mutex<Option<Child>>,
}

impl EspeakPlatform {
    /// Drives `program` (usually `"espeak-ng"` or `"espeak"`).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            voice: Mutex::new(None),
            child: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the synthesizer and feeds it `text`.
    fn spawn(&self, text: &str) -> Result<Child, PlatformError> {
        let mut command = Command::new(&self.program);
        let voice = self
            .voice
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(voice) = voice {
            command.arg("-v").arg(voice);
        }
        command
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = command.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                drop(stdin);
                reap(&mut child);
                return Err(e.into());
            }
        }
        Ok(child)
    }
}

impl SpeechPlatform for EspeakPlatform {
    fn voices(&self) -> Result<Vec<Voice>, PlatformError> {
        let output = Command::new(&self.program).arg("--voices").output()?;
        if !output.status.success() {
            return Err(PlatformError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn default_voice(&self) -> Result<Option<Voice>, PlatformError> {
        let voices = self.voices()?;
        let preferred = voices
            .iter()
            .position(|v| v.language.as_deref() == Some(ESPEAK_DEFAULT_LANGUAGE))
            .unwrap_or(0);
        Ok(voices.into_iter().nth(preferred))
    }

    fn select_voice(&self, voice: &Voice) -> Result<(), PlatformError> {
        *self.voice.lock().unwrap_or_else(PoisonError::into_inner) = Some(voice.id.clone());
        Ok(())
    }

    fn speak_blocking(&self, text: &str) -> Result<(), PlatformError> {
        let status = self.spawn(text)?.wait()?;
        if !status.success() {
            return Err(PlatformError::Command {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn speak_async(&self, text: &str) -> Result<(), PlatformError> {
        let child = self.spawn(text)?;
        let previous = self.lock_child().replace(child);
        if let Some(mut previous) = previous {
            // Reap a finished predecessor so it does not linger as a zombie.
            let _ = previous.try_wait();
        }
        Ok(())
    }

    fn status(&self) -> Result<RunState, PlatformError> {
        let mut guard = self.lock_child();
        let Some(child) = guard.as_mut() else {
            return Ok(RunState::Done);
        };
        match child.try_wait()? {
            Some(status) => {
                log::debug!("{} finished: {status}", self.program);
                *guard = None;
                Ok(RunState::Done)
            }
            None => Ok(RunState::Running),
        }
    }

    fn stop(&self) -> Result<(), PlatformError> {
        if let Some(mut child) = self.lock_child().take() {
            if child.try_wait()?.is_none() {
                child.kill()?;
                child.wait()?;
            }
        }
        Ok(())
    }
}

/// Kills and waits for a child that will not be handed out.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill after failed write: {e}");
    }
    if let Err(e) = child.wait() {
        log::warn!("failed to reap synthesizer: {e}");
    }
}

impl Drop for EspeakPlatform {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to stop {}: {e}", self.program);
        }
    }
}

/// Parses the table printed by `espeak-ng --voices`:
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
///
/// Underscores in the voice name stand for spaces.
fn parse_voice_list(output: &str) -> Vec<Voice> {
    output
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let priority = columns.next()?;
            if !priority.chars().all(|c| c.is_ascii_digit()) {
                return None; // header
            }
            let language = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            let file = columns.next()?;
            Some(Voice::new(file, name.replace('_', " ")).with_language(language))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  be              --/M      Belarusian         zle/be
 2  en              --/M      English_(Great_Britain) gmw/en      (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  ru              --/M      Russian            zle/ru
";

    #[test]
    fn parses_voice_table() {
        let voices = parse_voice_list(VOICES);
        assert_eq!(voices.len(), 5);
        assert_eq!(voices[0].id, "gmw/af");
        assert_eq!(voices[0].name, "Afrikaans");
        assert_eq!(voices[3].name, "English (America)");
        assert_eq!(voices[3].language.as_deref(), Some("en-us"));
        assert!(voices[4].speaks("ru"));
    }

    #[test]
    fn skips_header_and_short_lines() {
        let voices = parse_voice_list("Pty Language Age/Gender VoiceName File\n\n 5 xx\n");
        assert!(voices.is_empty());
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let platform = EspeakPlatform::new("/nonexistent/espeak-ng-binary");
        assert!(matches!(platform.voices(), Err(PlatformError::Io(_))));
        assert!(matches!(platform.speak_async("hi"), Err(PlatformError::Io(_))));
    }

    #[test]
    fn status_without_request_is_done() {
        let platform = EspeakPlatform::new("espeak-ng");
        assert_eq!(platform.status().unwrap(), RunState::Done);
        assert!(platform.stop().is_ok());
    }

    // --- stand-in synthesizer scripts ---

    #[cfg(unix)]
    mod scripted {
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use std::process::Command;
        use std::time::{Duration, Instant};

        use tempfile::{tempdir, TempDir};

        use super::*;

        /// Writes an executable `/bin/sh` script and returns its path.
        fn script(dir: &TempDir, name: &str, body: &str) -> String {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
            path.to_string_lossy().into_owned()
        }

        fn wait_for_done(platform: &EspeakPlatform, limit: Duration) -> bool {
            let deadline = Instant::now() + limit;
            while Instant::now() < deadline {
                if platform.status().expect("status") == RunState::Done {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            false
        }

        fn process_alive(pid_file: &Path) -> bool {
            let pid = std::fs::read_to_string(pid_file).expect("pid file");
            Command::new("kill")
                .arg("-0")
                .arg(pid.trim())
                .status()
                .expect("run kill")
                .success()
        }

        #[test]
        fn async_request_runs_then_completes() {
            let dir = tempdir().expect("temp dir");
            let program = script(&dir, "slow.sh", "cat >/dev/null\nsleep 0.3");
            let platform = EspeakPlatform::new(program);

            platform.speak_async("hello").expect("speak");
            assert_eq!(platform.status().unwrap(), RunState::Running);
            assert!(wait_for_done(&platform, Duration::from_secs(5)));
            assert_eq!(platform.status().unwrap(), RunState::Done);
        }

        #[test]
        fn stop_kills_running_synthesizer() {
            let dir = tempdir().expect("temp dir");
            let pid_file = dir.path().join("pid");
            let body = format!("echo $$ > '{}'\ncat >/dev/null\nexec sleep 30", pid_file.display());
            let program = script(&dir, "long.sh", &body);
            let platform = EspeakPlatform::new(program);

            platform.speak_async("a long story").expect("speak");
            let deadline = Instant::now() + Duration::from_secs(5);
            while !pid_file.exists() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            assert!(process_alive(&pid_file));

            let started = Instant::now();
            platform.stop().expect("stop");
            assert!(started.elapsed() < Duration::from_secs(5));
            assert_eq!(platform.status().unwrap(), RunState::Done);
            assert!(!process_alive(&pid_file));
        }

        #[test]
        fn blocking_speech_reports_exit_status() {
            let dir = tempdir().expect("temp dir");
            let ok = EspeakPlatform::new(script(&dir, "ok.sh", "cat >/dev/null"));
            assert!(ok.speak_blocking("fine").is_ok());

            let failing = EspeakPlatform::new(script(&dir, "fail.sh", "cat >/dev/null\nexit 3"));
            let err = failing.speak_blocking("broken").unwrap_err();
            assert!(matches!(err, PlatformError::Command { .. }));
            assert!(err.to_string().contains('3'));
        }

        #[test]
        fn selected_voice_and_stdin_flag_are_passed() {
            let dir = tempdir().expect("temp dir");
            let args_file = dir.path().join("args");
            let body = format!("echo \"$@\" > '{}'\ncat >/dev/null", args_file.display());
            let platform = EspeakPlatform::new(script(&dir, "args.sh", &body));

            platform
                .select_voice(&Voice::new("zle/ru", "Russian"))
                .expect("select");
            platform.speak_blocking("привет").expect("speak");

            let args = std::fs::read_to_string(&args_file).expect("args file");
            assert_eq!(args.trim(), "-v zle/ru --stdin");
        }

        #[test]
        fn voices_come_from_program_output() {
            let dir = tempdir().expect("temp dir");
            let body = "echo 'Pty Language Age/Gender VoiceName File'\n\
                        echo ' 5  ru  --/M  Russian  zle/ru'\n\
                        echo ' 2  en  --/M  English_(Great_Britain)  gmw/en'";
            let platform = EspeakPlatform::new(script(&dir, "voices.sh", body));

            let voices = platform.voices().expect("voices");
            assert_eq!(voices.len(), 2);
            let default = platform.default_voice().expect("default").expect("a voice");
            assert_eq!(default.id, "gmw/en");
        }

        #[test]
        fn failed_text_write_reaps_synthesizer() {
            let dir = tempdir().expect("temp dir");
            let pid_file = dir.path().join("pid");
            let body = format!("echo $$ > '{}'\nexec 0<&-\nexec sleep 30", pid_file.display());
            let platform = EspeakPlatform::new(script(&dir, "closer.sh", &body));

            // Larger than a pipe buffer so the write cannot complete before
            // the script closes its stdin.
            let text = "слова ".repeat(40_000);
            let err = platform.speak_async(&text).unwrap_err();
            assert!(matches!(err, PlatformError::Io(_)));

            assert!(!process_alive(&pid_file));
            assert_eq!(platform.status().unwrap(), RunState::Done);
        }
    }
}
