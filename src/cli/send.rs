use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Subcommand};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use crate::cli::write_json_line;
use crate::error::ProtocolError;
use crate::handlers::{
    AnimationUploadHandler, Brightness, BrightnessHandler, ChronographAction, ChronographHandler,
    ClockHandler, ClockOptions, ClockStyle, CountdownAction, CountdownHandler, DiyModeHandler,
    EcoHandler, EcoSchedule, EffectHandler, EffectStyle, FullscreenColourHandler,
    GraffitiHandler, ImageUploadHandler, MAX_GRAFFITI_PIXELS, MAX_SCORE, Pixel, PowerHandler, Rgb,
    ScoreboardHandler, ScreenHandler, ScreenPower, TextColourMode, TextHandler, TextMode,
    TextOptions, TimeSyncHandler, UploadReceipt,
};
use crate::media::{Rgb888Frame, ScreenSize};
use crate::transport::Transport;

/// JSON result emitted by `send`.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum SendResult {
    Power { state: String },
    Brightness { percent: u8 },
    Flip { flipped: bool },
    Freeze,
    Reset,
    SyncTime { unix_timestamp: i64 },
    Clock { style: ClockStyle },
    Countdown { action: CountdownAction, minutes: u8, seconds: u8 },
    Chronograph { action: ChronographAction },
    Eco { enabled: bool },
    Effect { style: EffectStyle, colours: usize },
    Colour { colour: Rgb },
    Diy { enabled: bool },
    Graffiti { pixels: usize, commands: usize },
    Scoreboard { left: u16, right: u16 },
    Text { characters: usize },
    Image { receipt: UploadReceipt },
    Animation { receipt: UploadReceipt },
}

/// Arguments for the `send` command.
#[derive(Debug, Args)]
pub struct SendArgs {
    #[command(subcommand)]
    command: SendCommand,
}

impl SendArgs {
    #[must_use]
    pub fn new(command: SendCommand) -> Self {
        Self { command }
    }
}

/// One device command.
#[derive(Debug, Subcommand)]
pub enum SendCommand {
    /// Turn the screen on or off.
    Power { state: ScreenPower },
    /// Set brightness; values are clamped into 5..=100.
    Brightness { percent: u8 },
    /// Rotate the picture by 180 degrees.
    Flip {
        #[arg(action = ArgAction::Set)]
        flipped: bool,
    },
    /// Toggle freezing the current picture.
    Freeze,
    /// Reset the panel.
    Reset,
    /// Set the device clock; uses local time when `--unix` is omitted.
    SyncTime {
        #[arg(long)]
        unix: Option<i64>,
    },
    /// Show a clock face.
    Clock {
        #[arg(long, default_value_t = ClockStyle::default())]
        style: ClockStyle,
        #[arg(long)]
        no_date: bool,
        #[arg(long)]
        twelve_hour: bool,
        #[arg(long, default_value = "ffffff")]
        colour: Rgb,
    },
    /// Control the countdown timer.
    Countdown {
        action: CountdownAction,
        #[arg(default_value_t = 0)]
        minutes: u8,
        #[arg(default_value_t = 0)]
        seconds: u8,
    },
    /// Control the stopwatch.
    Chronograph { action: ChronographAction },
    /// Configure the nightly dimming window.
    Eco {
        start_hour: u8,
        start_minute: u8,
        end_hour: u8,
        end_minute: u8,
        brightness: u8,
        #[arg(long)]
        disable: bool,
    },
    /// Show a colour effect with 2 to 7 colours.
    Effect {
        style: EffectStyle,
        #[arg(required = true, num_args = 2..=7)]
        colours: Vec<Rgb>,
    },
    /// Fill the screen with one colour.
    Colour { colour: Rgb },
    /// Switch DIY drawing mode.
    Diy { state: ScreenPower },
    /// Paint pixels given as `x,y`.
    Graffiti {
        colour: Rgb,
        #[arg(required = true, value_parser = parse_pixel)]
        pixels: Vec<Pixel>,
    },
    /// Show two counters (clamped to 999).
    Scoreboard { left: u16, right: u16 },
    /// Show scrolling text.
    Text {
        text: String,
        #[arg(long, default_value_t = TextMode::default())]
        mode: TextMode,
        #[arg(long, default_value_t = 95)]
        speed: u8,
        #[arg(long, default_value_t = TextColourMode::default())]
        colour_mode: TextColourMode,
        #[arg(long, default_value = "ffffff")]
        colour: Rgb,
        #[arg(long)]
        background: Option<Rgb>,
    },
    /// Upload a raw RGB888 frame sized for `--screen-size`.
    Image { path: PathBuf },
    /// Upload prepared GIF bytes.
    Animation { path: PathBuf },
}

fn parse_pixel(value: &str) -> Result<Pixel, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("pixel `{value}` must look like `x,y`"))?;
    let coordinate = |part: &str| {
        part.trim()
            .parse::<u8>()
            .map_err(|error| format!("pixel `{value}`: {error}"))
    };
    Ok(Pixel::new(coordinate(x)?, coordinate(y)?))
}

/// Executes the `send` command against a connected transport.
#[instrument(skip(transport, args, out), level = "info", fields(command = ?args.command))]
pub(crate) async fn run<W>(
    transport: &dyn Transport,
    args: &SendArgs,
    screen_size: ScreenSize,
    out: &mut W,
) -> Result<()>
where
    W: io::Write,
{
    let result = dispatch(transport, &args.command, screen_size).await?;
    write_json_line(out, &result)
}

async fn dispatch(
    transport: &dyn Transport,
    command: &SendCommand,
    screen_size: ScreenSize,
) -> Result<SendResult> {
    let result = match command {
        SendCommand::Power { state } => {
            PowerHandler::set_power(transport, *state).await?;
            SendResult::Power {
                state: state.to_string(),
            }
        }
        SendCommand::Brightness { percent } => {
            let brightness = Brightness::clamped(*percent);
            BrightnessHandler::set_brightness(transport, brightness).await?;
            SendResult::Brightness {
                percent: brightness.percent(),
            }
        }
        SendCommand::Flip { flipped } => {
            ScreenHandler::set_flipped(transport, *flipped).await?;
            SendResult::Flip { flipped: *flipped }
        }
        SendCommand::Freeze => {
            ScreenHandler::freeze(transport).await?;
            SendResult::Freeze
        }
        SendCommand::Reset => {
            ScreenHandler::reset(transport).await?;
            SendResult::Reset
        }
        SendCommand::SyncTime { unix } => {
            let timestamp = match unix {
                Some(value) => OffsetDateTime::from_unix_timestamp(*value)
                    .with_context(|| format!("invalid unix timestamp: {value}"))?,
                None => TimeSyncHandler::now(),
            };
            TimeSyncHandler::sync_time(transport, timestamp).await?;
            SendResult::SyncTime {
                unix_timestamp: timestamp.unix_timestamp(),
            }
        }
        SendCommand::Clock {
            style,
            no_date,
            twelve_hour,
            colour,
        } => {
            let options = ClockOptions::builder()
                .style(*style)
                .show_date(!no_date)
                .hour_24(!twelve_hour)
                .colour(*colour)
                .build();
            ClockHandler::show_clock(transport, options).await?;
            SendResult::Clock { style: *style }
        }
        SendCommand::Countdown {
            action,
            minutes,
            seconds,
        } => {
            CountdownHandler::set_countdown(transport, *action, *minutes, *seconds).await?;
            SendResult::Countdown {
                action: *action,
                minutes: *minutes,
                seconds: *seconds,
            }
        }
        SendCommand::Chronograph { action } => {
            ChronographHandler::set_chronograph(transport, *action).await?;
            SendResult::Chronograph { action: *action }
        }
        SendCommand::Eco {
            start_hour,
            start_minute,
            end_hour,
            end_minute,
            brightness,
            disable,
        } => {
            let schedule = EcoSchedule::builder()
                .enabled(!disable)
                .start_hour(*start_hour)
                .start_minute(*start_minute)
                .end_hour(*end_hour)
                .end_minute(*end_minute)
                .brightness(*brightness)
                .build();
            EcoHandler::set_schedule(transport, schedule).await?;
            SendResult::Eco { enabled: !disable }
        }
        SendCommand::Effect { style, colours } => {
            EffectHandler::show_effect(transport, *style, colours).await?;
            SendResult::Effect {
                style: *style,
                colours: colours.len(),
            }
        }
        SendCommand::Colour { colour } => {
            FullscreenColourHandler::set_colour(transport, *colour).await?;
            SendResult::Colour { colour: *colour }
        }
        SendCommand::Diy { state } => {
            let enabled = *state == ScreenPower::On;
            DiyModeHandler::set_enabled(transport, enabled).await?;
            SendResult::Diy { enabled }
        }
        SendCommand::Graffiti { colour, pixels } => {
            GraffitiHandler::paint(transport, *colour, pixels).await?;
            SendResult::Graffiti {
                pixels: pixels.len(),
                commands: pixels.len().div_ceil(MAX_GRAFFITI_PIXELS),
            }
        }
        SendCommand::Scoreboard { left, right } => {
            ScoreboardHandler::set_scores(transport, *left, *right).await?;
            SendResult::Scoreboard {
                left: (*left).min(MAX_SCORE),
                right: (*right).min(MAX_SCORE),
            }
        }
        SendCommand::Text {
            text,
            mode,
            speed,
            colour_mode,
            colour,
            background,
        } => {
            let options = TextOptions::builder()
                .mode(*mode)
                .speed(*speed)
                .colour_mode(*colour_mode)
                .colour(*colour)
                .maybe_background(*background)
                .build();
            TextHandler::show_text(transport, text, options).await?;
            SendResult::Text {
                characters: text.chars().count(),
            }
        }
        SendCommand::Image { path } => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read image file {}", path.display()))?;
            let frame = Rgb888Frame::try_from((screen_size, bytes))
                .map_err(ProtocolError::from)?;
            let receipt = ImageUploadHandler::upload(transport, &frame).await?;
            SendResult::Image { receipt }
        }
        SendCommand::Animation { path } => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read animation file {}", path.display()))?;
            let receipt = AnimationUploadHandler::upload(transport, &bytes).await?;
            SendResult::Animation { receipt }
        }
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::cli::{Args, Command};
    use crate::handlers::test_support::connected_fake;

    fn parse_send(extra: &[&str]) -> Result<SendCommand, clap::Error> {
        let argv = ["idm-link", "send"].into_iter().chain(extra.iter().copied());
        let args = Args::try_parse_from(argv)?;
        let (command, _settings) = args
            .into_command_and_settings()
            .expect("settings should build");
        match command {
            Command::Send(send) => Ok(send.command),
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[rstest]
    #[case(&["power", "on"][..])]
    #[case(&["brightness", "250"][..])]
    #[case(&["flip", "true"][..])]
    #[case(&["clock", "--style", "hourglass", "--twelve-hour"][..])]
    #[case(&["countdown", "start", "5", "30"][..])]
    #[case(&["effect", "vertical-rainbow", "ff0000", "00ff00"][..])]
    #[case(&["graffiti", "#ffffff", "1,2", "3,4"][..])]
    #[case(&["text", "Hello", "--mode", "blinking", "--background", "000044"][..])]
    fn valid_commands_parse(#[case] extra: &[&str]) {
        parse_send(extra).expect("command should parse");
    }

    #[rstest]
    #[case(&["effect", "vertical-rainbow", "ff0000"][..])]
    #[case(&["graffiti", "ffffff", "1;2"][..])]
    #[case(&["colour", "red"][..])]
    #[case(&["power", "maybe"][..])]
    #[case(&["effect", "random-pixels", "1", "2", "3", "4", "5", "6", "7", "8"][..])]
    fn invalid_commands_are_rejected(#[case] extra: &[&str]) {
        parse_send(extra).expect_err("command should be rejected");
    }

    #[test]
    fn missing_subcommand_is_reported() {
        let error = Args::try_parse_from(["idm-link", "send"]).expect_err("send needs a command");
        assert_eq!(ErrorKind::MissingSubcommand, error.kind());
    }

    #[tokio::test]
    async fn brightness_result_reports_clamped_value() {
        let (transport, journal) = connected_fake().await;
        let mut out = Vec::new();

        run(
            &transport,
            &SendArgs::new(SendCommand::Brightness { percent: 1 }),
            ScreenSize::Size32,
            &mut out,
        )
        .await
        .expect("send should succeed");

        assert_eq!(
            "{\"command\":\"brightness\",\"percent\":5}\n",
            String::from_utf8(out).expect("output should be utf-8")
        );
        assert_eq!(vec![5, 0, 4, 128, 5], journal.writes()[0].bytes);
    }

    #[tokio::test]
    async fn graffiti_result_counts_commands() {
        let (transport, _journal) = connected_fake().await;
        let pixels = vec![Pixel::new(0, 0); 300];

        let result = dispatch(
            &transport,
            &SendCommand::Graffiti {
                colour: Rgb::WHITE,
                pixels,
            },
            ScreenSize::Size32,
        )
        .await
        .expect("graffiti should send");

        assert_eq!(
            serde_json::json!({"command": "graffiti", "pixels": 300, "commands": 2}),
            serde_json::to_value(result).expect("result should serialise")
        );
    }
}
