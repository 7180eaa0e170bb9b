//! Microsecond simulation clocks, anchored to the tokio clock so that
//! paused-time tests drive them deterministically.
//!
//! Server and client timelines are distinct phantom-marked types; mixing
//! them up is a compile error.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Clone, Copy, Debug)]
pub struct ServerMarker;
pub type ServerEpoch = Epoch<ServerMarker>;
pub type ServerTime = SimTime<ServerMarker>;

#[derive(Clone, Copy, Debug)]
pub struct ClientMarker;
pub type ClientEpoch = Epoch<ClientMarker>;
pub type ClientTime = SimTime<ClientMarker>;

/// The zero point of a timeline. All [`SimTime`] values on that timeline
/// are microsecond offsets from it.
#[derive(Debug)]
pub struct Epoch<M> {
    instant: Instant,
    _marker: PhantomData<M>,
}

impl<M> Clone for Epoch<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Epoch<M> {}

impl<M> Epoch<M> {
    pub fn at_now() -> Self {
        Self {
            instant: Instant::now(),
            _marker: PhantomData,
        }
    }

    pub fn now(self) -> SimTime<M> {
        SimTime::from_micros_since_epoch((Instant::now() - self.instant).as_micros() as i64)
    }

    pub fn instant_at(self, time: SimTime<M>) -> Instant {
        self.instant + Duration::from_micros(time.micros.max(0) as u64)
    }
}

/// A point on one timeline, in microseconds since its epoch.
#[derive(Debug)]
pub struct SimTime<M> {
    micros: i64,
    _marker: PhantomData<M>,
}

impl<M> SimTime<M> {
    pub fn from_micros_since_epoch(micros: i64) -> Self {
        Self {
            micros,
            _marker: PhantomData,
        }
    }

    pub fn as_micros_since_epoch(self) -> i64 {
        self.micros
    }

    pub fn as_millis(self) -> i64 {
        self.micros / 1_000
    }
}

impl<M> Clone for SimTime<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for SimTime<M> {}

impl<M> PartialEq for SimTime<M> {
    fn eq(&self, other: &Self) -> bool {
        self.micros == other.micros
    }
}

impl<M> Eq for SimTime<M> {}

impl<M> PartialOrd for SimTime<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for SimTime<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.micros.cmp(&other.micros)
    }
}

impl<M> Add<SimDuration> for SimTime<M> {
    type Output = Self;

    fn add(self, rhs: SimDuration) -> Self {
        Self::from_micros_since_epoch(self.micros + rhs.micros)
    }
}

impl<M> AddAssign<SimDuration> for SimTime<M> {
    fn add_assign(&mut self, rhs: SimDuration) {
        self.micros += rhs.micros;
    }
}

impl<M> Sub for SimTime<M> {
    type Output = SimDuration;

    fn sub(self, rhs: Self) -> SimDuration {
        SimDuration::from_micros(self.micros - rhs.micros)
    }
}

/// A signed span of simulation time, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimDuration {
    micros: i64,
}

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration { micros: 0 };

    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self {
            micros: millis * 1_000,
        }
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self {
            micros: secs * 1_000_000,
        }
    }

    pub const fn as_micros(self) -> i64 {
        self.micros
    }

    pub fn as_millis_f64(self) -> f64 {
        self.micros as f64 * 1e-3
    }

    pub fn as_secs_f32(self) -> f32 {
        self.micros as f32 * 1e-6
    }

    pub fn mul_f64(self, rhs: f64) -> Self {
        Self::from_micros((self.micros as f64 * rhs).round() as i64)
    }
}

impl TryFrom<Duration> for SimDuration {
    type Error = std::num::TryFromIntError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Ok(Self::from_micros(value.as_micros().try_into()?))
    }
}

impl Add for SimDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_micros(self.micros + rhs.micros)
    }
}

impl AddAssign for SimDuration {
    fn add_assign(&mut self, rhs: Self) {
        self.micros += rhs.micros;
    }
}

impl Sub for SimDuration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_micros(self.micros - rhs.micros)
    }
}

impl SubAssign for SimDuration {
    fn sub_assign(&mut self, rhs: Self) {
        self.micros -= rhs.micros;
    }
}

impl Neg for SimDuration {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_micros(-self.micros)
    }
}

impl Mul<i64> for SimDuration {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        Self::from_micros(self.micros * rhs)
    }
}

impl Div<i64> for SimDuration {
    type Output = Self;

    fn div(self, rhs: i64) -> Self {
        Self::from_micros(self.micros / rhs)
    }
}
