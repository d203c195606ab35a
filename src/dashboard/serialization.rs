use base64::Engine;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// 时间戳反序列化函数
///
/// 服务器返回的 `sentTime` 格式不统一，以下几种都接受：
/// - RFC 3339：`2024-05-01T10:00:00Z`、`2024-05-01T10:00:00+08:00`
/// - 不带时区的 ISO-8601：`2024-05-01T10:00:00` / `2024-05-01T10:00:00.123`（按 UTC 处理）
/// - 毫秒时间戳：`1714557600000`
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Millis(i64),
        Text(String),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("无效的毫秒时间戳: {}", ms))),
        RawTimestamp::Text(s) => parse_timestamp(&s).map_err(serde::de::Error::custom),
    }
}

/// 解析文本时间戳
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("无法解析时间 {:?}: {}", s, e))
}

/// 兼容字符串和数字两种形式的 ID
pub fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// 解码 JWT 的 payload 段（不校验签名，仅用于诊断）
///
/// 不是 JWT 格式的 token 返回 `None`
pub fn decode_jwt_claims(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// 读取 JWT 的 `exp` 声明
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let exp = decode_jwt_claims(token)?.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

/// 日志中只输出 token 前几位
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{}***", prefix)
}
