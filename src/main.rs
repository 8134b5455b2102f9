//! Application entry point: command-line front-end for the settings and
//! text-to-speech subsystem.
//!
//! # Startup sequence
//!
//! 1. Parse the command line and initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the settings controller: locale catalog, device lists from cpal,
//!    persisted selections from `settings.ini`.
//! 4. Run the requested command.  Speech commands build the speech engine
//!    on demand; `tell` runs on a tokio runtime and can be cancelled with
//!    Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use voice_settings::{
    audio::CpalEnumerator,
    config::{AppConfig, AppPaths, SpeechConfig},
    settings::{
        controller::LocaleUsage, DeviceEnumerator, ListItem, LocaleEntry, SettingsController,
        SettingsFile, StaticEnumerator,
    },
    speech::{EspeakPlatform, SpeechEngine, SpeechOutcome, SpeechPlatform, Tts},
};

#[derive(Parser)]
#[command(name = "voice-settings")]
#[command(about = "Audio device, language and text-to-speech settings")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the selections file (overrides the config file)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current device and language selections
    Show,

    /// List input and output devices
    Devices,

    /// List the languages offered for UI, speech recognition and synthesis
    Languages,

    /// Select input and/or output device by list position and save
    SetDevice {
        #[arg(long)]
        input: Option<usize>,
        #[arg(long)]
        output: Option<usize>,
    },

    /// Select UI, TTS and/or STT language by locale code and save
    SetLanguage {
        #[arg(long)]
        ui: Option<String>,
        #[arg(long)]
        tts: Option<String>,
        #[arg(long)]
        stt: Option<String>,
    },

    /// List installed text-to-speech voices
    Voices,

    /// Speak text and wait until it has been spoken
    Say {
        text: String,
        /// Voice display name (defaults to a voice for the TTS language)
        #[arg(long)]
        voice: Option<String>,
    },

    /// Speak text asynchronously; Ctrl-C cancels
    Tell {
        text: String,
        /// Voice display name (defaults to a voice for the TTS language)
        #[arg(long)]
        voice: Option<String>,
    },

    /// Write the effective configuration to the config file
    WriteConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // 2. Configuration
    let config_result = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = config_result.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if let Some(path) = cli.settings {
        config.settings.file = Some(path);
    }

    // 3. Settings
    let enumerator: Box<dyn DeviceEnumerator> = if config.audio.enumerate_devices {
        Box::new(CpalEnumerator::new())
    } else {
        Box::new(StaticEnumerator::empty())
    };
    let settings =
        SettingsController::initialize(enumerator.as_ref(), SettingsFile::new(config.settings_file()));

    // 4. Command
    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => show(&settings),
        Commands::Devices => list_devices(&settings),
        Commands::Languages => list_languages(&settings),
        Commands::SetDevice { input, output } => {
            set_devices(&settings, input, output)?;
            show(&settings);
        }
        Commands::SetLanguage { ui, tts, stt } => {
            set_languages(&settings, ui, tts, stt)?;
            show(&settings);
        }
        Commands::Voices => {
            let tts = build_tts(&config)?;
            let current = tts.current_voice().map(str::to_owned);
            for name in tts.voice_list() {
                println!("{} {name}", marker(current.as_deref() == Some(name.as_str())));
            }
        }
        Commands::Say { text, voice } => {
            let mut tts = build_tts(&config)?;
            choose_voice(&mut tts, &settings, &config.speech, voice.as_deref())?;
            tts.say(&text)?;
        }
        Commands::Tell { text, voice } => {
            let mut tts = build_tts(&config)?;
            choose_voice(&mut tts, &settings, &config.speech, voice.as_deref())?;
            tell(tts, &text)?;
        }
        Commands::WriteConfig => {
            let path = cli.config.unwrap_or_else(|| AppPaths::new().config_file);
            config
                .save_to(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("config written to {}", path.display());
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Settings commands
// ---------------------------------------------------------------------------

fn marker(selected: bool) -> &'static str {
    if selected {
        "*"
    } else {
        " "
    }
}

fn show(settings: &SettingsController) {
    let name = |device: Option<Arc<voice_settings::settings::Device>>| {
        device.map_or_else(|| "(none)".to_owned(), |d| d.name().to_owned())
    };
    println!("input device:  {}", name(settings.current_input_device()));
    println!("output device: {}", name(settings.current_output_device()));
    println!("ui language:   {}", settings.current_locale(LocaleUsage::Ui).code());
    println!("tts language:  {}", settings.current_locale(LocaleUsage::Tts).code());
    println!("stt language:  {}", settings.current_locale(LocaleUsage::Stt).code());
}

fn print_list<T: ListItem>(title: &str, items: &[Arc<T>], current: Option<usize>) {
    println!("{title}:");
    if items.is_empty() {
        println!("    (none)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("  {} {i}: {} [{}]", marker(current == Some(i)), item.label(), item.key());
    }
}

fn list_devices(settings: &SettingsController) {
    print_list("output devices", &settings.output_devices(), settings.output_device());
    print_list("input devices", &settings.input_devices(), settings.input_device());
}

fn list_languages(settings: &SettingsController) {
    print_list("ui languages", &settings.ui_languages(), settings.ui_language());
    print_list("stt languages", &settings.stt_languages(), settings.stt_language());
    print_list("tts languages", &settings.tts_languages(), settings.tts_language());
}

fn set_devices(
    settings: &SettingsController,
    input: Option<usize>,
    output: Option<usize>,
) -> Result<()> {
    if let Some(index) = input {
        if index >= settings.input_devices().len() {
            log::warn!("no input device at position {index}");
        }
        settings.set_input_device(index);
    }
    if let Some(index) = output {
        if index >= settings.output_devices().len() {
            log::warn!("no output device at position {index}");
        }
        settings.set_output_device(index);
    }
    settings.save_settings().context("saving settings")
}

fn set_languages(
    settings: &SettingsController,
    ui: Option<String>,
    tts: Option<String>,
    stt: Option<String>,
) -> Result<()> {
    let requests = [(LocaleUsage::Ui, ui), (LocaleUsage::Tts, tts), (LocaleUsage::Stt, stt)];
    for (usage, code) in requests {
        let Some(code) = code else { continue };
        if !settings.catalog().contains(&code) {
            let known: Vec<&str> = settings.catalog().codes().collect();
            log::warn!("unknown locale `{code}` (known: {})", known.join(", "));
        }
        settings.set_language(usage, &code);
    }
    settings.save_settings().context("saving settings")
}

// ---------------------------------------------------------------------------
// Speech commands
// ---------------------------------------------------------------------------

fn build_tts(config: &AppConfig) -> Result<Tts> {
    let platform: Arc<dyn SpeechPlatform> = Arc::new(EspeakPlatform::new(&config.speech.program));
    let interval = config.speech.poll_interval();
    let engine = match &config.speech.voice {
        Some(id) => SpeechEngine::with_voice(platform, id, interval),
        None => SpeechEngine::new(platform, interval),
    }
    .with_context(|| format!("starting speech engine `{}`", config.speech.program))?;
    Ok(Tts::new(engine)?)
}

/// Explicit voice name first, then the configured voice, then a voice for
/// the TTS language.
fn choose_voice(
    tts: &mut Tts,
    settings: &SettingsController,
    speech: &SpeechConfig,
    voice: Option<&str>,
) -> Result<()> {
    let fallback = locale_fallback(speech, settings);
    if tts.choose_voice(voice, fallback.as_deref())? {
        return Ok(());
    }
    match voice {
        Some(name) => bail!("no voice named `{name}`; run `voice-settings voices`"),
        None => log::info!(
            "no voice for {}; using {:?}",
            fallback.as_ref().map_or("?", |l| l.code()),
            tts.current_voice()
        ),
    }
    Ok(())
}

/// The TTS locale to pick a voice for, unless the config names a voice.
fn locale_fallback(speech: &SpeechConfig, settings: &SettingsController) -> Option<Arc<LocaleEntry>> {
    match speech.voice {
        Some(_) => None,
        None => Some(settings.current_locale(LocaleUsage::Tts)),
    }
}

fn tell(tts: Tts, text: &str) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    rt.block_on(async move {
        let task = tts.tell(text)?;
        let cancel = task.cancel_handle();
        let wait = task.wait();
        tokio::pin!(wait);

        let outcome = tokio::select! {
            outcome = &mut wait => outcome,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                // Resolves once the poll task has stopped the synthesizer.
                (&mut wait).await
            }
        };

        match outcome {
            SpeechOutcome::Finished => log::info!("finished speaking"),
            SpeechOutcome::Cancelled => log::info!("speech cancelled"),
            SpeechOutcome::Failed(e) => bail!("speech failed: {e}"),
        }
        Ok::<(), anyhow::Error>(())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
