//! Prayer clock times computed from the sun's position.
//!
//! Fajr, Isha and (for some methods) Maghrib are the moments the sun reaches
//! a given depression angle below the horizon; Dhuhr is solar noon; Asr is
//! when an object's shadow reaches a multiple of its length plus the noon
//! shadow. Sunrise and sunset come from the `sunrise` crate.
//!
//! Each time is found with a single pass from a fixed initial guess, which
//! keeps the error well under a minute away from the poles.

use anyhow::{Result, bail};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use sunrise::{Coordinates, SolarDay, SolarEvent};

use super::{CalculationMethod, CalculationParams, RawTimeProvider, RawTimes};
use crate::prayer::PrayerName;

/// Sun's upper limb on the horizon, with refraction.
const RISE_SET_ANGLE: f64 = 0.833;

/// Beyond this the `sunrise` crate is not asked; the angle formula with the
/// high-latitude fallback covers those dates instead.
const SOLAR_EVENT_MAX_LATITUDE: f64 = 65.0;

#[derive(Debug, Clone, Copy)]
enum Twilight {
    Angle(f64),
    /// Minutes after Maghrib
    Minutes(f64),
}

#[derive(Debug, Clone, Copy)]
struct MethodAngles {
    fajr: f64,
    isha: Twilight,
    /// Maghrib at a depression angle instead of at sunset
    maghrib: Option<f64>,
    /// Midnight halfway between sunset and Fajr instead of sunset and sunrise
    jafari_midnight: bool,
}

impl CalculationMethod {
    fn angles(self) -> MethodAngles {
        let standard = |fajr, isha| MethodAngles {
            fajr,
            isha: Twilight::Angle(isha),
            maghrib: None,
            jafari_midnight: false,
        };
        match self {
            CalculationMethod::Mwl => standard(18.0, 17.0),
            CalculationMethod::Isna => standard(15.0, 15.0),
            CalculationMethod::Egypt => standard(19.5, 17.5),
            CalculationMethod::Karachi => standard(18.0, 18.0),
            CalculationMethod::Makkah => MethodAngles {
                fajr: 18.5,
                isha: Twilight::Minutes(90.0),
                maghrib: None,
                jafari_midnight: false,
            },
            CalculationMethod::Tehran => MethodAngles {
                fajr: 17.7,
                isha: Twilight::Angle(14.0),
                maghrib: Some(4.5),
                jafari_midnight: true,
            },
            CalculationMethod::Jafari => MethodAngles {
                fajr: 16.0,
                isha: Twilight::Angle(14.0),
                maghrib: Some(4.0),
                jafari_midnight: true,
            },
        }
    }
}

/// Computes raw times with the standard astronomical prayer-time formulas.
#[derive(Debug, Clone, Copy, Default)]
pub struct AstronomicalProvider;

impl RawTimeProvider for AstronomicalProvider {
    fn raw_times(&self, date: NaiveDate, params: &CalculationParams) -> Result<RawTimes> {
        let hours = compute_hours(date, params);
        let mut raw = RawTimes::new();
        for (prayer, value) in PrayerName::ALL.into_iter().zip(hours) {
            if !value.is_finite() {
                bail!(
                    "{} cannot be computed at latitude {:.4} on {date}",
                    prayer,
                    params.latitude
                );
            }
            raw.insert(prayer.key().to_string(), format_hours(value));
        }
        Ok(raw)
    }

    fn name(&self) -> &'static str {
        "astronomical"
    }
}

// # Degree trigonometry

fn dsin(d: f64) -> f64 {
    d.to_radians().sin()
}

fn dcos(d: f64) -> f64 {
    d.to_radians().cos()
}

fn dtan(d: f64) -> f64 {
    d.to_radians().tan()
}

fn darcsin(x: f64) -> f64 {
    x.asin().to_degrees()
}

/// NaN when the sun never reaches the angle that day.
fn darccos(x: f64) -> f64 {
    x.acos().to_degrees()
}

fn darccot(x: f64) -> f64 {
    (1.0 / x).atan().to_degrees()
}

fn fix_angle(a: f64) -> f64 {
    a.rem_euclid(360.0)
}

fn fix_hour(h: f64) -> f64 {
    h.rem_euclid(24.0)
}

/// Hours from `from` forward to `to`, wrapping at 24.
fn time_diff(from: f64, to: f64) -> f64 {
    fix_hour(to - from)
}

fn julian_day(date: NaiveDate) -> f64 {
    let (mut year, mut month) = (date.year() as f64, date.month() as f64);
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }
    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + date.day() as f64 + b
        - 1524.5
}

/// Sun position for one date and location, in local solar hours.
struct SolarClock {
    julian: f64,
    latitude: f64,
}

impl SolarClock {
    /// (declination, equation of time) at `portion` of the day.
    fn sun_position(&self, portion: f64) -> (f64, f64) {
        let d = self.julian + portion - 2_451_545.0;
        let g = fix_angle(357.529 + 0.985_600_28 * d);
        let q = fix_angle(280.459 + 0.985_647_36 * d);
        let l = fix_angle(q + 1.915 * dsin(g) + 0.020 * dsin(2.0 * g));
        let e = 23.439 - 0.000_000_36 * d;

        let right_ascension = (dcos(e) * dsin(l)).atan2(dcos(l)).to_degrees() / 15.0;
        let equation = q / 15.0 - fix_hour(right_ascension);
        let declination = darcsin(dsin(e) * dsin(l));
        (declination, equation)
    }

    fn mid_day(&self, portion: f64) -> f64 {
        let (_, equation) = self.sun_position(portion);
        fix_hour(12.0 - equation)
    }

    /// Time the sun is `angle` degrees below the horizon; before noon when
    /// `before_noon` is set.
    fn sun_angle_time(&self, angle: f64, portion: f64, before_noon: bool) -> f64 {
        let (declination, _) = self.sun_position(portion);
        let noon = self.mid_day(portion);
        let t = darccos(
            (-dsin(angle) - dsin(declination) * dsin(self.latitude))
                / (dcos(declination) * dcos(self.latitude)),
        ) / 15.0;
        if before_noon { noon - t } else { noon + t }
    }

    fn asr_time(&self, factor: f64, portion: f64) -> f64 {
        let (declination, _) = self.sun_position(portion);
        let angle = -darccot(factor + dtan((self.latitude - declination).abs()));
        self.sun_angle_time(angle, portion, false)
    }
}

/// UTC offset in hours at local noon, so DST follows the date.
fn utc_offset_hours(tz: Tz, date: NaiveDate) -> f64 {
    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    let seconds = tz
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.offset().fix().local_minus_utc())
        .unwrap_or_else(|| tz.from_utc_datetime(&noon).offset().fix().local_minus_utc());
    f64::from(seconds) / 3600.0
}

/// Local clock hours of a UTC instant, measured from 00:00 of `date`.
fn local_hours(event: DateTime<Utc>, tz: Tz, date: NaiveDate) -> f64 {
    let local = event.with_timezone(&tz);
    let day_shift = (local.date_naive() - date).num_days() as f64 * 24.0;
    day_shift
        + f64::from(local.hour())
        + f64::from(local.minute()) / 60.0
        + f64::from(local.second()) / 3600.0
}

/// Sunrise and sunset in local hours from the `sunrise` crate.
fn solar_events(date: NaiveDate, params: &CalculationParams) -> Option<(f64, f64)> {
    if params.latitude.abs() > SOLAR_EVENT_MAX_LATITUDE {
        return None;
    }
    let coordinates = Coordinates::new(params.latitude, params.longitude)?;
    let day = SolarDay::new(coordinates, date);
    let sunrise = local_hours(day.event_time(SolarEvent::Sunrise), params.time_zone, date);
    let sunset = local_hours(day.event_time(SolarEvent::Sunset), params.time_zone, date);
    (sunrise.is_finite() && sunset.is_finite()).then_some((sunrise, sunset))
}

/// Pull a twilight time that is missing, or too far into the night, back to
/// `angle / 60` of the night measured from `base`.
fn adjust_high_latitude(time: f64, base: f64, angle: f64, night: f64, before: bool) -> f64 {
    let portion = angle / 60.0 * night;
    let diff = if before {
        time_diff(time, base)
    } else {
        time_diff(base, time)
    };
    if time.is_nan() || diff > portion {
        if before { base - portion } else { base + portion }
    } else {
        time
    }
}

/// Local clock hours for every prayer in cycle order. Values may fall
/// outside 0..24 and are normalised when formatted.
fn compute_hours(date: NaiveDate, params: &CalculationParams) -> [f64; 7] {
    let angles = params.method.angles();
    let clock = SolarClock {
        julian: julian_day(date) - params.longitude / (15.0 * 24.0),
        latitude: params.latitude,
    };
    let adjust = utc_offset_hours(params.time_zone, date) - params.longitude / 15.0;

    let mut fajr = clock.sun_angle_time(angles.fajr, 5.0 / 24.0, true) + adjust;
    let dhuhr = clock.mid_day(12.0 / 24.0) + adjust;
    let asr = clock.asr_time(params.asr_factor.shadow_factor(), 13.0 / 24.0) + adjust;

    let (sunrise, sunset) = solar_events(date, params).unwrap_or_else(|| {
        (
            clock.sun_angle_time(RISE_SET_ANGLE, 6.0 / 24.0, true) + adjust,
            clock.sun_angle_time(RISE_SET_ANGLE, 18.0 / 24.0, false) + adjust,
        )
    });
    let night = time_diff(sunset, sunrise);

    fajr = adjust_high_latitude(fajr, sunrise, angles.fajr, night, true);

    let maghrib = match angles.maghrib {
        Some(angle) => adjust_high_latitude(
            clock.sun_angle_time(angle, 18.0 / 24.0, false) + adjust,
            sunset,
            angle,
            night,
            false,
        ),
        None => sunset,
    };

    let isha = match angles.isha {
        Twilight::Angle(angle) => adjust_high_latitude(
            clock.sun_angle_time(angle, 18.0 / 24.0, false) + adjust,
            sunset,
            angle,
            night,
            false,
        ),
        Twilight::Minutes(minutes) => maghrib + minutes / 60.0,
    };

    let midnight = if angles.jafari_midnight {
        sunset + time_diff(sunset, fajr) / 2.0
    } else {
        sunset + time_diff(sunset, sunrise) / 2.0
    };

    [fajr, sunrise, dhuhr, asr, maghrib, isha, midnight]
}

/// `HH:MM`, rounded to the nearest minute.
fn format_hours(hours: f64) -> String {
    let hours = fix_hour(hours + 0.5 / 60.0);
    let whole = hours.floor();
    let minutes = ((hours - whole) * 60.0).floor();
    format!("{:02}:{:02}", whole as u32, minutes as u32)
}
