use bytes::BufMut;
use time::{
    Duration, OffsetDateTime, PrimitiveDateTime, UtcDateTime, UtcOffset,
    format_description::{BorrowedFormatItem as I, Component as C, modifier},
};

use super::{
    DecodeError, EncodeError, HostType, Value,
    codec::{codec, get_fixed},
};

const PG_EPOCH_DATE: time::Date = {
    // source: `from_julian_day` docs
    match time::Date::from_julian_day(2_451_545) {
        Ok(ok) => ok,
        Err(_) => panic!("2000-01-01 is a valid date"),
    }
};

const PRIMITIVE_PG_EPOCH: PrimitiveDateTime = PrimitiveDateTime::new(PG_EPOCH_DATE, time::Time::MIDNIGHT);

const UTC_PG_EPOCH: UtcDateTime = UtcDateTime::new(PG_EPOCH_DATE, time::Time::MIDNIGHT);

const DATE_TIME: &[I<'_>] = &[
    I::Component(C::Year(modifier::Year::default())),
    I::Literal(b"-"),
    I::Component(C::Month(modifier::Month::default())),
    I::Literal(b"-"),
    I::Component(C::Day(modifier::Day::default())),
    I::Literal(b" "),
    I::Component(C::Hour(modifier::Hour::default())),
    I::Literal(b":"),
    I::Component(C::Minute(modifier::Minute::default())),
    I::Literal(b":"),
    I::Component(C::Second(modifier::Second::default())),
    I::Optional(&I::Compound(&[
        I::Literal(b"."),
        I::Component(C::Subsecond(modifier::Subsecond::default())),
    ])),
];

const OFFSET_HOUR: modifier::OffsetHour = {
    let mut m = modifier::OffsetHour::default();
    m.sign_is_mandatory = true;
    m
};

/// `YYYY-MM-DD HH:MM:SS[.ffffff]+HH[:MM]`, server renders the offset of its
/// `TimeZone` setting.
const DATE_TIME_TZ: &[I<'_>] = &[
    I::Compound(DATE_TIME),
    I::Component(C::OffsetHour(OFFSET_HOUR)),
    I::Optional(&I::Compound(&[
        I::Literal(b":"),
        I::Component(C::OffsetMinute(modifier::OffsetMinute::default())),
    ])),
];

/// Offset from the postgres epoch.
///
/// `infinity` and `-infinity` are sent as the extremes of `i64`.
fn since_epoch(be: [u8; 8]) -> Result<Duration, DecodeError> {
    match i64::from_be_bytes(be) {
        i64::MAX | i64::MIN => Err(DecodeError::OutOfRange),
        micros => Ok(Duration::microseconds(micros)),
    }
}

fn micros_since(value: Duration) -> Result<i64, EncodeError> {
    i64::try_from(value.whole_microseconds()).map_err(|_|EncodeError::OutOfRange)
}

codec! {
    /// `timestamp` codec, date and time without time zone.
    pub struct Timestamp: Timestamp => Timestamp;

    fn text_decode(_, text, _) {
        Ok(Value::Timestamp(PrimitiveDateTime::parse(text, DATE_TIME)?))
    }

    fn text_encode(_, value, out, _) {
        let Value::Timestamp(value) = value else {
            return Err(EncodeError::TypeMismatch { expected: HostType::Timestamp, found: value.host_type() });
        };
        out.push_str(&value.format(DATE_TIME)?);
        Ok(())
    }

    fn binary_decode(_, buf, _) {
        match get_fixed::<8>(buf)? {
            Some(be) => PRIMITIVE_PG_EPOCH
                .checked_add(since_epoch(be)?)
                .map(Value::Timestamp)
                .ok_or(DecodeError::OutOfRange),
            None => Ok(Value::Null),
        }
    }

    fn binary_encode(_, value, buf, _) {
        let Value::Timestamp(value) = value else {
            return Err(EncodeError::TypeMismatch { expected: HostType::Timestamp, found: value.host_type() });
        };
        let micros = micros_since(*value - PRIMITIVE_PG_EPOCH)?;
        buf.put_i32(8);
        buf.put_i64(micros);
        Ok(())
    }
}

codec! {
    /// `timestamptz` codec, an instant stored as UTC.
    pub struct TimestampTz: TimestampTZ => TimestampTz;

    fn text_decode(_, text, _) {
        let value = OffsetDateTime::parse(text, DATE_TIME_TZ)?.to_offset(UtcOffset::UTC);
        Ok(Value::TimestampTz(UtcDateTime::new(value.date(), value.time())))
    }

    fn text_encode(_, value, out, _) {
        let Value::TimestampTz(value) = value else {
            return Err(EncodeError::TypeMismatch { expected: HostType::TimestampTz, found: value.host_type() });
        };
        out.push_str(&value.format(DATE_TIME)?);
        out.push_str("+00");
        Ok(())
    }

    fn binary_decode(_, buf, _) {
        match get_fixed::<8>(buf)? {
            Some(be) => UTC_PG_EPOCH
                .checked_add(since_epoch(be)?)
                .map(Value::TimestampTz)
                .ok_or(DecodeError::OutOfRange),
            None => Ok(Value::Null),
        }
    }

    fn binary_encode(_, value, buf, _) {
        let Value::TimestampTz(value) = value else {
            return Err(EncodeError::TypeMismatch { expected: HostType::TimestampTz, found: value.host_type() });
        };
        let micros = micros_since(PrimitiveDateTime::new(value.date(), value.time()) - PRIMITIVE_PG_EPOCH)?;
        buf.put_i32(8);
        buf.put_i64(micros);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};
    use time::{Date, Month};

    use super::*;
    use crate::types::{BinaryDecoder, BinaryEncoder, PrimitiveType, SessionContext, TextDecoder, TextEncoder, Type};

    const TS: Type = Type::new(1114, "timestamp", PrimitiveType::Timestamp);
    const TSTZ: Type = Type::new(1184, "timestamptz", PrimitiveType::TimestampTZ);

    fn datetime(y: i32, m: Month, d: u8, hms: (u8, u8, u8), micro: u32) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(y, m, d).unwrap();
        date.with_hms_micro(hms.0, hms.1, hms.2, micro).unwrap()
    }

    #[test]
    fn epoch_is_zero() {
        let cx = SessionContext::default();
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Timestamp, &TS, &Value::Timestamp(PRIMITIVE_PG_EPOCH), &mut buf, &cx).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 8, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn binary_microseconds() {
        let cx = SessionContext::default();
        // one day and one microsecond after 2000-01-01
        let micros: i64 = 86_400_000_001;
        let mut buf = BytesMut::new();
        buf.put_i32(8);
        buf.put_i64(micros);
        let value = BinaryDecoder::decode(&Timestamp, &TS, &mut Bytes::from(buf), &cx).unwrap();
        assert_eq!(value, Value::Timestamp(datetime(2000, Month::January, 2, (0, 0, 0), 1)));
    }

    #[test]
    fn infinity_is_out_of_range() {
        let cx = SessionContext::default();
        for micros in [i64::MAX, i64::MIN] {
            let mut buf = BytesMut::new();
            buf.put_i32(8);
            buf.put_i64(micros);
            let buf = Bytes::from(buf);

            let err = BinaryDecoder::decode(&Timestamp, &TS, &mut buf.clone(), &cx);
            assert!(matches!(err, Err(DecodeError::OutOfRange)));
            let err = BinaryDecoder::decode(&TimestampTz, &TSTZ, &mut buf.clone(), &cx);
            assert!(matches!(err, Err(DecodeError::OutOfRange)));
        }

        // past year 9999 without the `large-dates` feature
        let mut buf = BytesMut::new();
        buf.put_i32(8);
        buf.put_i64(i64::MAX - 1);
        let err = BinaryDecoder::decode(&Timestamp, &TS, &mut Bytes::from(buf), &cx);
        assert!(matches!(err, Err(DecodeError::OutOfRange)));
    }

    #[test]
    fn text() {
        let cx = SessionContext::default();
        let value = TextDecoder::decode(&Timestamp, &TS, "2024-02-29 13:14:15.5", &cx).unwrap();
        assert_eq!(value, Value::Timestamp(datetime(2024, Month::February, 29, (13, 14, 15), 500_000)));

        let value = TextDecoder::decode(&Timestamp, &TS, "2024-02-29 13:14:15", &cx).unwrap();
        assert_eq!(value, Value::Timestamp(datetime(2024, Month::February, 29, (13, 14, 15), 0)));

        let value = TextDecoder::decode(&TimestampTz, &TSTZ, "2024-02-29 13:14:15+07", &cx).unwrap();
        let utc = datetime(2024, Month::February, 29, (6, 14, 15), 0);
        assert_eq!(value, Value::TimestampTz(UtcDateTime::new(utc.date(), utc.time())));

        let mut out = String::new();
        TextEncoder::encode(&TimestampTz, &TSTZ, &value, &mut out, &cx).unwrap();
        assert_eq!(out, "2024-02-29 06:14:15.0+00");
    }
}
