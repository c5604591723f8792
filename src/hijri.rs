//! Civil date to localized Hijri date.
//!
//! Conversion uses the Umm al-Qura tables from `hijri_date`. Dates outside
//! the range those tables cover fall back to the tabular (arithmetic) Islamic
//! civil calendar, so a label is always produced.

use chrono::{Datelike, Days, NaiveDate};
use hijri_date::HijriDate;

use crate::error::PrayerError;

/// A Hijri calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HijriDay {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

type MonthNames = [&'static str; 12];

const MONTHS_EN: MonthNames = [
    "Muharram",
    "Safar",
    "Rabi' al-Awwal",
    "Rabi' al-Thani",
    "Jumada al-Awwal",
    "Jumada al-Thani",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

const MONTHS_AR: MonthNames = [
    "محرم",
    "صفر",
    "ربيع الأول",
    "ربيع الآخر",
    "جمادى الأولى",
    "جمادى الآخرة",
    "رجب",
    "شعبان",
    "رمضان",
    "شوال",
    "ذو القعدة",
    "ذو الحجة",
];

const MONTHS_MS: MonthNames = [
    "Muharam",
    "Safar",
    "Rabiulawal",
    "Rabiulakhir",
    "Jamadilawal",
    "Jamadilakhir",
    "Rejab",
    "Syaaban",
    "Ramadan",
    "Syawal",
    "Zulkaedah",
    "Zulhijah",
];

const MONTHS_TR: MonthNames = [
    "Muharrem",
    "Safer",
    "Rebiülevvel",
    "Rebiülahir",
    "Cemaziyelevvel",
    "Cemaziyelahir",
    "Recep",
    "Şaban",
    "Ramazan",
    "Şevval",
    "Zilkade",
    "Zilhicce",
];

const MONTHS_FR: MonthNames = [
    "Mouharram",
    "Safar",
    "Rabia al awal",
    "Rabia ath-thani",
    "Joumada al oula",
    "Joumada ath-thania",
    "Rajab",
    "Chaabane",
    "Ramadan",
    "Chawwal",
    "Dhou al qi`da",
    "Dhou al-hijja",
];

/// Month names for the primary subtag of a language code (`ms-MY` -> `ms`).
fn month_names(language: &str) -> Option<&'static MonthNames> {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match primary.as_str() {
        "en" => Some(&MONTHS_EN),
        "ar" => Some(&MONTHS_AR),
        "ms" | "id" => Some(&MONTHS_MS),
        "tr" => Some(&MONTHS_TR),
        "fr" => Some(&MONTHS_FR),
        _ => None,
    }
}

/// Formats Hijri labels for civil dates in one configured locale.
#[derive(Debug, Clone)]
pub struct HijriDateResolver {
    language: String,
    months: Option<&'static MonthNames>,
    adjustment_days: i64,
}

impl HijriDateResolver {
    /// `adjustment_days` shifts every conversion to follow local moon sighting.
    pub fn new(language: &str, adjustment_days: i64) -> Self {
        Self {
            language: language.to_string(),
            months: month_names(language),
            adjustment_days,
        }
    }

    /// `LocaleUnavailable` when the language has no month table.
    pub fn locale_warning(&self) -> Option<PrayerError> {
        self.months.is_none().then(|| PrayerError::LocaleUnavailable {
            language: self.language.clone(),
        })
    }

    /// Hijri label for `civil_date`, or for the day after it when
    /// `advance_one_day` is set.
    pub fn resolve(&self, civil_date: NaiveDate, advance_one_day: bool) -> String {
        let date = if advance_one_day {
            civil_date.succ_opt().unwrap_or(civil_date)
        } else {
            civil_date
        };
        self.format(self.convert(date))
    }

    pub fn convert(&self, civil_date: NaiveDate) -> HijriDay {
        let adjusted = shift_days(civil_date, self.adjustment_days);
        umm_al_qura(adjusted).unwrap_or_else(|| tabular_from_civil(adjusted))
    }

    /// `D Month YYYY`, or `D/M/YYYY` without a month table.
    pub fn format(&self, day: HijriDay) -> String {
        match self.months {
            Some(names) => {
                let name = names[(day.month.clamp(1, 12) - 1) as usize];
                format!("{} {} {}", day.day, name, day.year)
            }
            None => format!("{}/{}/{}", day.day, day.month, day.year),
        }
    }
}

fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Gregorian years covered by the Umm al-Qura tables (1356-1500 AH).
const UMM_AL_QURA_YEARS: std::ops::RangeInclusive<i32> = 1938..=2076;

fn umm_al_qura(date: NaiveDate) -> Option<HijriDay> {
    if !UMM_AL_QURA_YEARS.contains(&date.year()) {
        return None;
    }
    let year = usize::try_from(date.year()).ok()?;
    let hijri = HijriDate::from_gr(year, date.month() as usize, date.day() as usize).ok()?;
    Some(HijriDay {
        year: hijri.year() as i64,
        month: hijri.month() as u32,
        day: hijri.day() as u32,
    })
}

// # Tabular Islamic civil calendar
//
// Day counts are rata die (1 = 0001-01-01 proleptic Gregorian), the same
// numbering chrono uses for `num_days_from_ce`.

/// Rata die of 1 Muharram 1 AH in the civil (Friday) epoch.
const ISLAMIC_EPOCH: i64 = 227_015;

fn fixed_from_tabular(year: i64, month: i64, day: i64) -> i64 {
    day + 29 * (month - 1)
        + (6 * month - 1).div_euclid(11)
        + (year - 1) * 354
        + (3 + 11 * year).div_euclid(30)
        + ISLAMIC_EPOCH
        - 1
}

fn tabular_from_civil(date: NaiveDate) -> HijriDay {
    let fixed = i64::from(date.num_days_from_ce());
    let year = (30 * (fixed - ISLAMIC_EPOCH) + 10_646).div_euclid(10_631);
    let prior_days = fixed - fixed_from_tabular(year, 1, 1);
    let month = (11 * prior_days + 330).div_euclid(325);
    let day = fixed - fixed_from_tabular(year, month, 1) + 1;
    HijriDay {
        year,
        month: month as u32,
        day: day as u32,
    }
}
