//! Shared value types: timestamps, calendar dates on the wire, and clocks
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// CBOR codec for [`NaiveDate`] fields, stored as days since the common era.
///
/// Use with `#[cbor(n(..), with = "crate::types::cbor_date")]`.
pub mod cbor_date {
    use chrono::{Datelike, NaiveDate};

    pub fn encode<C, W: minicbor::encode::Write>(
        date: &NaiveDate,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(date.num_days_from_ce())?.ok()
    }

    pub fn decode<'b, C>(
        d: &mut minicbor::Decoder<'b>,
        _: &mut C,
    ) -> Result<NaiveDate, minicbor::decode::Error> {
        let days = d.i32()?;
        NaiveDate::from_num_days_from_ce_opt(days)
            .ok_or_else(|| minicbor::decode::Error::message("day count out of range"))
    }
}

/// Source of "today" for date rules, injected so callers control time.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> TimeStamp<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
    fn now(&self) -> TimeStamp<Utc> {
        TimeStamp::new()
    }
}

/// A clock pinned to one calendar day, used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
    fn now(&self) -> TimeStamp<Utc> {
        // noon keeps the instant on the same calendar day in every zone we report in
        TimeStamp::new_with(self.0.year(), self.0.month(), self.0.day(), 12, 0, 0)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, minicbor::Encode, minicbor::Decode)]
    struct Dated {
        #[cbor(n(0), with = "crate::types::cbor_date")]
        day: NaiveDate,
        #[n(1)]
        at: TimeStamp<Utc>,
    }

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn dates_survive_storage() {
        let original = Dated {
            day: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            at: TimeStamp::new_with(2025, 6, 1, 9, 30, 0).unwrap(),
        };

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: Dated = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn fixed_clock_reports_its_day() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let clock = FixedClock(day);

        assert_eq!(clock.today(), day);
        assert_eq!(clock.now().to_datetime_utc().date_naive(), day);
    }
}
