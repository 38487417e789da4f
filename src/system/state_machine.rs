//! State Machine
//!
//! Root of the controller. Owns the behavioral state, the wall-follower and
//! the delivery progress, and is the only writer of all three.
//!
//! # Tick
//! Each tick dispatches exactly one state handler, then waits the fixed
//! tick period. Long entry actions (doorway probe, room scan, exit) run to
//! completion inside their tick; every wait inside them re-checks the
//! emergency flag, so the loop still exits promptly once the Safety Monitor
//! trips it.
//!
//! # Transitions
//! - FollowingLine → CheckingDoorway on orange while packages remain
//! - FollowingLine → EnteringRoom on the mail-room tile, or the open
//!   mail-room branch at a black junction, once the quota is met
//! - CheckingDoorway → EnteringRoom when clear, otherwise back to
//!   FollowingLine (or AvoidingRestricted in detour mode)
//! - EnteringRoom → ScanningRoom, or MissionComplete in the mail room
//! - ScanningRoom → Delivering / ExitingRoom
//! - Delivering → ExitingRoom
//! - ExitingRoom, AvoidingRestricted → FollowingLine
//!
//! Orange is ignored for `doorway_cooldown` after leaving a doorway behind,
//! so the strip just crossed cannot start a second check.
//! - MissionComplete is terminal

use embassy_time::{Instant, Timer};

use crate::system::config::RestrictedDoorway;
use crate::system::context::RobotContext;
use crate::system::emergency::Aborted;
use crate::system::junction::{self, ColorEvent, Cooldown, Doorway, JunctionOutcome};
use crate::system::logging::{log_info, log_warn};
use crate::system::room;
use crate::system::room_scan::{self, ScanResult};
use crate::system::sensors::{ColorSensor, DistanceSensor, Hardware, Notifier};
use crate::system::state::{DeliveryProgress, Destination, RobotState};
use crate::system::wall_follow::{Throttle, WallCommand, WallFollower};

/// Why the run loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunOutcome {
    MissionComplete,
    EmergencyStop,
}

pub struct StateMachine<'a, H: Hardware> {
    ctx: RobotContext<'a, H>,
    state: RobotState,
    wall: WallFollower,
    progress: DeliveryProgress,
    color_check: Throttle,
    black_cooldown: Cooldown,
    doorway_cooldown: Cooldown,
    destination: Destination,
    mission_announced: bool,
}

impl<'a, H: Hardware> StateMachine<'a, H> {
    pub fn new(ctx: RobotContext<'a, H>) -> Self {
        let config = ctx.config;
        Self {
            state: RobotState::FollowingLine,
            wall: WallFollower::new(
                config.wall_tolerance_cm,
                config.max_range_cm,
                config.bad_read_limit,
            ),
            progress: DeliveryProgress::new(),
            color_check: Throttle::new(config.color_check_interval),
            black_cooldown: Cooldown::new(config.junction_cooldown),
            doorway_cooldown: Cooldown::new(config.doorway_cooldown),
            destination: Destination::Office,
            mission_announced: false,
            ctx,
        }
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn progress(&self) -> DeliveryProgress {
        self.progress
    }

    pub fn wall(&self) -> &WallFollower {
        &self.wall
    }

    /// Runs until the mission completes or the emergency flag is set, and
    /// leaves every motor stopped
    pub async fn run(&mut self) -> RunOutcome {
        log_info!("starting in {} ms", self.ctx.config.start_delay.as_millis());

        let outcome = match self.ctx.emergency.hold(self.ctx.config.start_delay).await {
            Err(Aborted) => RunOutcome::EmergencyStop,
            Ok(()) => self.run_loop().await,
        };

        self.ctx.halt();
        match outcome {
            RunOutcome::MissionComplete => log_info!("mission complete"),
            RunOutcome::EmergencyStop => log_warn!("stopped by emergency in {:?}", self.state),
        }
        outcome
    }

    async fn run_loop(&mut self) -> RunOutcome {
        loop {
            if self.ctx.emergency.is_set() {
                return RunOutcome::EmergencyStop;
            }
            if self.tick().await.is_err() {
                return RunOutcome::EmergencyStop;
            }
            if self.state.is_terminal() && self.mission_announced {
                return RunOutcome::MissionComplete;
            }
            Timer::after(self.ctx.config.tick_period).await;
        }
    }

    /// Dispatches the handler of the current state once
    pub async fn tick(&mut self) -> Result<(), Aborted> {
        let next = match self.state {
            RobotState::FollowingLine => self.follow_line().await?,
            RobotState::CheckingDoorway => self.check_doorway().await?,
            RobotState::EnteringRoom => self.enter_room().await?,
            RobotState::ScanningRoom => self.scan_room().await?,
            RobotState::Delivering => {
                room::deliver(&mut self.ctx, &mut self.progress).await?;
                RobotState::ExitingRoom
            }
            RobotState::ExitingRoom => {
                room::exit_room(&mut self.ctx).await?;
                self.wall.clear_target();
                self.doorway_cooldown.start(Instant::now());
                RobotState::FollowingLine
            }
            RobotState::AvoidingRestricted => {
                junction::avoid_restricted(&mut self.ctx).await?;
                self.wall.clear_target();
                self.doorway_cooldown.start(Instant::now());
                RobotState::FollowingLine
            }
            RobotState::MissionComplete => {
                self.complete_mission();
                RobotState::MissionComplete
            }
        };

        if next != self.state {
            log_info!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
        Ok(())
    }

    async fn follow_line(&mut self) -> Result<RobotState, Aborted> {
        let reading = self.ctx.distance.read_distance_cm().await;
        match self.wall.update(reading) {
            WallCommand::Steer(steering) => self.ctx.motion.steer(steering),
            WallCommand::FailSafeStop => self.ctx.motion.stop(),
        }

        let now = Instant::now();
        if !self.color_check.ready(now) {
            return Ok(RobotState::FollowingLine);
        }

        let label = self.ctx.color.read_color().await;
        match junction::color_event(label, &self.progress) {
            Some(ColorEvent::Doorway) if !self.doorway_cooldown.is_active(now) => {
                self.ctx.motion.stop();
                Ok(RobotState::CheckingDoorway)
            }
            Some(ColorEvent::MailRoomTile) => {
                self.ctx.motion.stop();
                self.destination = Destination::MailRoom;
                Ok(RobotState::EnteringRoom)
            }
            Some(ColorEvent::BlackJunction) if !self.black_cooldown.is_active(now) => {
                self.black_junction().await
            }
            Some(ColorEvent::Doorway | ColorEvent::BlackJunction) | None => {
                Ok(RobotState::FollowingLine)
            }
        }
    }

    async fn black_junction(&mut self) -> Result<RobotState, Aborted> {
        let outcome = junction::handle_black_junction(&mut self.ctx, &self.progress).await?;
        self.black_cooldown.start(Instant::now());

        match outcome {
            JunctionOutcome::Unreadable | JunctionOutcome::ReturnedToWall => {
                self.wall.clear_target();
                Ok(RobotState::FollowingLine)
            }
            JunctionOutcome::OuterCorner(distance) => {
                self.wall.lock(distance);
                Ok(RobotState::FollowingLine)
            }
            JunctionOutcome::MailRoomAhead => {
                self.destination = Destination::MailRoom;
                Ok(RobotState::EnteringRoom)
            }
        }
    }

    async fn check_doorway(&mut self) -> Result<RobotState, Aborted> {
        match junction::check_doorway(&mut self.ctx).await? {
            Doorway::Clear => {
                self.destination = Destination::Office;
                Ok(RobotState::EnteringRoom)
            }
            Doorway::Restricted => match self.ctx.config.restricted_doorway {
                RestrictedDoorway::PassBy => {
                    junction::pass_restricted(&mut self.ctx).await?;
                    self.doorway_cooldown.start(Instant::now());
                    Ok(RobotState::FollowingLine)
                }
                RestrictedDoorway::Detour => Ok(RobotState::AvoidingRestricted),
            },
        }
    }

    async fn enter_room(&mut self) -> Result<RobotState, Aborted> {
        room::enter_room(&mut self.ctx).await?;
        if self.destination == Destination::MailRoom && self.progress.quota_met() {
            Ok(RobotState::MissionComplete)
        } else {
            Ok(RobotState::ScanningRoom)
        }
    }

    async fn scan_room(&mut self) -> Result<RobotState, Aborted> {
        match room_scan::scan_room(&mut self.ctx).await {
            ScanResult::Found => Ok(RobotState::Delivering),
            ScanResult::NotFound => {
                self.ctx.emergency.check()?;
                Ok(RobotState::ExitingRoom)
            }
        }
    }

    fn complete_mission(&mut self) {
        if self.mission_announced {
            return;
        }
        self.ctx.halt();
        let tone = self.ctx.config.mission_tone;
        self.ctx.notifier.play(tone.note, tone.duration, tone.volume);
        self.mission_announced = true;
    }
}
