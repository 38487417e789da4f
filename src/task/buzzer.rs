//! Piezo buzzer
//!
//! `Buzzer` is the controller-facing notifier: `play` only posts the tone to
//! a signal and returns. The buzzer task owns the PWM slice and plays the
//! latest tone, cutting a running tone short when a new one arrives.

use courier_robot::system::sensors::{Note, Notifier, Tone};
use defmt::debug;
use embassy_futures::select::{select, Either};
use embassy_rp::pwm::{Config, Pwm};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use crate::task::resources::BuzzerResources;

static TONE: Signal<CriticalSectionRawMutex, Tone> = Signal::new();

pub struct Buzzer;

impl Notifier for Buzzer {
    fn play(&mut self, note: Note, duration: Duration, volume: u8) {
        TONE.signal(Tone::new(note, duration, volume));
    }
}

/// PWM config producing `tone`; volume maps onto duty up to 50 %
fn tone_config(tone: &Tone) -> Config {
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();
    let freq_hz = tone.note.frequency_hz();
    let divider = ((clock_freq_hz / freq_hz) / 65535 + 1) as u8;
    let top = (clock_freq_hz / (freq_hz * divider as u32)) as u16 - 1;

    let mut config = Config::default();
    config.divider = divider.into();
    config.top = top;
    config.compare_a = (top as u32 * tone.volume.min(100) as u32 / 200) as u16;
    config
}

#[embassy_executor::task]
pub async fn buzzer(r: BuzzerResources) {
    let mut pwm = Pwm::new_output_a(r.slice, r.pin, Config::default());

    loop {
        let mut tone = TONE.wait().await;
        loop {
            debug!("tone {:?}", tone);
            pwm.set_config(&tone_config(&tone));
            match select(Timer::after(tone.duration), TONE.wait()).await {
                Either::First(()) => {
                    pwm.set_config(&Config::default());
                    break;
                }
                Either::Second(next) => tone = next,
            }
        }
    }
}
