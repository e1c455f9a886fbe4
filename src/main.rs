use std::{
    error::Error,
    io::BufRead,
    path::PathBuf,
    process::ExitCode,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use log::{debug, error, info};
use rotating_alarm::{
    alarm::{AlarmDraft, AlarmTime, Days, SoundChoice},
    alert::{run_alert_loop, TerminalAlerter},
    config::Config,
    display,
    error::AlarmError,
    host::{local, utc, Clock, FixedClock, Host, HostCommand, SystemClock},
    settings::Theme,
    AlarmClock,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// config file to use instead of the default one
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    /// don't read or write saved alarms, start from the sample alarms
    #[clap(long, global = true)]
    in_memory: bool,
    /// pretend it is this time (RFC 3339, e.g. 2024-01-01T07:00:00+01:00)
    #[clap(long, global = true, value_parser = parse_instant)]
    at: Option<DateTime<FixedOffset>>,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write a default config file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// show every alarm and when it rings next
    List,
    /// add an alarm
    Add {
        /// `HH:MM` or `H:MM AM`
        time: AlarmTime,
        #[clap(flatten)]
        fields: AlarmFields,
        /// add the alarm switched off
        #[clap(long)]
        disabled: bool,
    },
    /// change some fields of an alarm
    Edit {
        id: String,
        #[clap(long)]
        time: Option<AlarmTime>,
        #[clap(flatten)]
        fields: AlarmFields,
    },
    /// switch an alarm on or off
    Toggle { id: String },
    /// delete an alarm
    Remove { id: String },
    /// show the next alarm to ring
    Next,
    /// show the current rotation sound and when it changes
    Rotation,
    /// list the built in sounds
    Sounds,
    /// show or change settings
    Settings {
        #[clap(long, conflicts_with = "toggle_theme")]
        theme: Option<Theme>,
        /// switch between light and dark
        #[clap(long)]
        toggle_theme: bool,
        /// use the rotating sound for rotating alarms
        #[clap(long)]
        rotation: Option<bool>,
        #[clap(long)]
        gradual_wakeup: Option<bool>,
        /// snooze minutes for new alarms
        #[clap(long)]
        default_snooze: Option<u32>,
        /// volume for new alarms, 0.0 to 1.0
        #[clap(long)]
        default_volume: Option<f64>,
    },
    /// watch the alarms and ring them (the default)
    Run,
}

#[derive(clap::Args)]
struct AlarmFields {
    /// `weekdays`, `weekends`, `everyday` or a list like `mon,wed,fri`
    #[clap(long, value_parser = Days::parse_list)]
    days: Option<Days>,
    #[clap(long)]
    label: Option<String>,
    /// `rotating` or a sound file id, see `sounds`
    #[clap(long)]
    sound: Option<SoundChoice>,
    /// 0.0 to 1.0
    #[clap(long)]
    volume: Option<f64>,
    /// snooze length in minutes
    #[clap(long)]
    snooze: Option<u32>,
}

impl AlarmFields {
    fn apply(self, draft: &mut AlarmDraft) {
        if let Some(days) = self.days {
            draft.days = days;
        }
        if let Some(label) = self.label {
            draft.label = label;
        }
        if let Some(sound) = self.sound {
            draft.sound = sound;
        }
        if let Some(volume) = self.volume {
            draft.volume = volume;
        }
        if let Some(snooze) = self.snooze {
            draft.snooze_minutes = snooze;
        }
    }
}

fn parse_instant(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
}

fn main() -> ExitCode {
    // initialize the logger
    if let Err(e) = simple_file_logger::init_logger!("rotating_alarm") {
        eprintln!("couldn't initialize logger: {e:?}");
    }
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config_path = args.config.map_or_else(Config::config_path, Ok)?;
    let command = args.command.unwrap_or(Command::Run);
    if let Command::Init { force } = command {
        if config_path.exists() && !force {
            println!(
                "config already exists at {}, use --force to overwrite it",
                config_path.display()
            );
        } else {
            Config::new().save(&config_path)?;
            println!("wrote default config to {}", config_path.display());
        }
        return Ok(());
    }

    let config = Config::load(&config_path)?;
    let clock: Box<dyn Clock> = match args.at {
        Some(at) => Box::new(FixedClock(at)),
        None => Box::new(SystemClock),
    };
    let now = clock.now();
    let mut alarms = AlarmClock::open(config, args.in_memory)?;

    match command {
        Command::Init { .. } => {}
        Command::List => {
            if alarms.alarms().is_empty() {
                println!("No alarms set");
            }
            for alarm in alarms.alarms() {
                println!("{}", display::alarm_row(alarm, alarms.catalog(), local(now)));
            }
        }
        Command::Add {
            time,
            fields,
            disabled,
        } => {
            let mut draft = alarms.new_draft();
            draft.time = time;
            draft.enabled = !disabled;
            fields.apply(&mut draft);
            let id = alarms.add(draft, now)?;
            println!("added {id}");
        }
        Command::Edit { id, time, fields } => {
            let alarm = alarms
                .alarms()
                .get(&id)
                .ok_or_else(|| AlarmError::NotFound(id.clone()))?;
            let mut draft = AlarmDraft::from(alarm);
            if let Some(time) = time {
                draft.time = time;
            }
            fields.apply(&mut draft);
            alarms.replace(&id, draft)?;
            println!("updated {id}");
        }
        Command::Toggle { id } => {
            let enabled = alarms.toggle(&id)?;
            println!("{id} {}", if enabled { "enabled" } else { "disabled" });
        }
        Command::Remove { id } => {
            let removed = alarms.remove(&id)?;
            println!("removed {} ({})", removed.id(), removed.label());
        }
        Command::Next => println!("{}", display::next_alarm_line(alarms.alarms(), local(now))),
        Command::Rotation => {
            println!(
                "{}",
                display::rotation_line(alarms.catalog(), alarms.rotation(), utc(now))
            );
            if !alarms.settings().enable_rotation {
                println!(
                    "Rotation is off, rotating alarms play {}",
                    alarms.catalog().first().name
                );
            }
        }
        Command::Sounds => {
            let current = alarms.rotation().current_sound(alarms.catalog(), utc(now));
            for sound in alarms.catalog() {
                let marker = if sound == current { '*' } else { ' ' };
                println!("{marker} {sound}");
            }
        }
        Command::Settings {
            theme,
            toggle_theme,
            rotation,
            gradual_wakeup,
            default_snooze,
            default_volume,
        } => {
            let mut settings = alarms.settings().clone();
            if let Some(theme) = theme {
                settings.theme = theme;
            }
            if toggle_theme {
                settings.theme = !settings.theme;
            }
            if let Some(rotation) = rotation {
                settings.enable_rotation = rotation;
            }
            if let Some(gradual_wakeup) = gradual_wakeup {
                settings.gradual_wakeup = gradual_wakeup;
            }
            if let Some(default_snooze) = default_snooze {
                settings.default_snooze = default_snooze;
            }
            if let Some(default_volume) = default_volume {
                settings.default_volume = default_volume;
            }
            if &settings != alarms.settings() {
                alarms.update_settings(settings)?;
            }
            let settings = alarms.settings();
            println!("theme: {}", settings.theme);
            println!("rotation: {}", settings.enable_rotation);
            println!("gradual wake up: {}", settings.gradual_wakeup);
            println!("default snooze: {}m", settings.default_snooze);
            println!("default volume: {}", settings.default_volume);
        }
        Command::Run => watch(&mut alarms, clock.as_ref())?,
    }
    Ok(())
}

/// Polls the alarms until `quit` is typed, ringing them on a separate thread.
/// Changes saved by other commands meanwhile are picked up every tick.
fn watch(alarms: &mut AlarmClock, clock: &dyn Clock) -> Result<(), Box<dyn Error>> {
    let (alert_tx, alert_rx) = mpsc::channel();
    let alert_thread = thread::spawn(move || {
        let mut alerter = TerminalAlerter::new(std::io::stdout());
        run_alert_loop(&alert_rx, &mut alerter, Duration::from_secs(1));
    });

    // never joined, it stays blocked on stdin until the process exits
    let (command_tx, command_rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<HostCommand>() {
                Ok(command) => {
                    if command_tx.send(command).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
    });

    let now = clock.now();
    println!(
        "{}  {}",
        display::format_clock(now, &alarms.config().time_format),
        display::next_alarm_line(alarms.alarms(), local(now))
    );
    println!(
        "{}",
        display::rotation_line(alarms.catalog(), alarms.rotation(), utc(now))
    );
    info!("watching {} alarms", alarms.alarms().len());

    let tick = alarms.config().tick_interval();
    let mut host = Host::new();
    let mut stdin_open = true;
    loop {
        let mut messages = host.reload(alarms);
        messages.extend(host.tick(alarms, clock.now()));
        for message in messages {
            alert_tx.send(message)?;
        }
        let command = if stdin_open {
            match command_rx.recv_timeout(tick) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("stdin closed, only ringing alarms from now on");
                    stdin_open = false;
                    None
                }
            }
        } else {
            thread::sleep(tick);
            None
        };
        match command {
            Some(HostCommand::Quit) => break,
            Some(command) => {
                for message in host.handle(command, alarms, clock.now()) {
                    alert_tx.send(message)?;
                }
            }
            None => {}
        }
    }

    drop(alert_tx);
    alert_thread
        .join()
        .map_err(|_| "alert thread panicked")?;
    Ok(())
}
