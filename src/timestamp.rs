// Custom date + time type
// Fulfills serde + diesel traits

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{
    deserialize::{self, FromSql},
    pg::Pg,
    serialize::{self, Output, ToSql},
    sql_types, *,
};
use serde::{
    de, de::Visitor, Deserialize, Deserializer, Serialize, Serializer,
};
use std::{
    fmt,
    io::Write,
    ops::{Add, Sub},
};

#[derive(
    Debug, AsExpression, FromSqlRow, PartialEq, PartialOrd, Clone, Copy,
)]
#[sql_type = "sql_types::Timestamp"]
pub struct Timestamp(pub time::Timespec);

impl Timestamp {
    pub fn now() -> Timestamp {
        Timestamp(time::now().to_timespec())
    }

    pub fn from_secs(sec: i64) -> Timestamp {
        Timestamp(time::Timespec { sec, nsec: 0 })
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        let naive =
            NaiveDateTime::from_timestamp(self.0.sec, self.0.nsec as u32);
        DateTime::<Utc>::from_utc(naive, Utc)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_datetime().to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl Add<time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, other: time::Duration) -> Timestamp {
        Timestamp(self.0.add(other))
    }
}

impl Sub<time::Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, other: time::Duration) -> Timestamp {
        Timestamp(self.0.sub(other))
    }
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an rfc3339 or rfc2822 timestamp")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let datetime = DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_rfc2822(value))
            .map_err(|e| E::custom(format!("{}", e)))?;

        Ok(Timestamp(time::Timespec {
            sec: datetime.timestamp(),
            nsec: datetime.timestamp_subsec_nanos() as i32,
        }))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Timestamp, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TimestampVisitor)
    }
}

impl ToSql<sql_types::Timestamp, Pg> for Timestamp {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        ToSql::<sql_types::Timestamp, Pg>::to_sql(&self.0, out)
    }
}

impl FromSql<sql_types::Timestamp, Pg> for Timestamp {
    fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
        let ts = time::Timespec::from_sql(bytes)?;
        Ok(Timestamp(ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_secs(1_600_000_000);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2020-09-13T12:26:40+00:00\"");
    }

    #[test]
    fn accepts_rfc2822_input() {
        let ts: Timestamp =
            serde_json::from_str("\"Sun, 13 Sep 2020 12:26:40 +0000\"")
                .unwrap();
        assert_eq!(ts, Timestamp::from_secs(1_600_000_000));
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
    }

    #[test]
    fn duration_arithmetic_orders_correctly() {
        let now = Timestamp::from_secs(100_000);
        let earlier = now - time::Duration::hours(24);
        assert!(earlier < now);
        assert_eq!(earlier + time::Duration::hours(24), now);
    }
}
