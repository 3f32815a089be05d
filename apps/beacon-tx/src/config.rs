use config::{Config, ConfigError, Environment, File};
use rand::Rng;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use beacon_codec::{AddressOverride, BeaconIdentity, CodecError, DEFAULT_IDENTITY};
use beacon_radio::{AddressKind, AdvertisingParameters, ChannelMap, PowerLevel, RadioError};

#[derive(Debug, Deserialize, Clone)]
pub struct BeaconConfig {
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    pub measured_power: i8,
    /// Address override in human-readable order, e.g. `C8:FD:19:A4:A6:F7`.
    pub address: Option<String>,
    /// Draw a fresh static random address at startup when no `address` is set.
    pub random_address: bool,
    pub address_kind: AddressKind,
    pub min_interval_ms: u32,
    pub max_interval_ms: u32,
    #[serde(deserialize_with = "deserialize_channels")]
    pub channels: Vec<u8>,
    pub power_level: PowerLevel,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub radio_timeout: Duration,
    pub adapter_name: Option<String>,
}

fn deserialize_channels<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ChannelsVisitor;

    impl<'de> Visitor<'de> for ChannelsVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a channel number, a list string or a sequence of channel numbers")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u8::try_from(value)
                .map(|ch| vec![ch])
                .map_err(|_| E::custom(format!("channel {value} out of range")))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u8::try_from(value)
                .map(|ch| vec![ch])
                .map_err(|_| E::custom(format!("channel {value} out of range")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            value
                .split(|c| c == ',' || c == ';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u8>()
                        .map_err(|_| E::custom(format!("invalid channel `{s}`")))
                })
                .collect()
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(element) = seq.next_element()? {
                vec.push(element);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(ChannelsVisitor)
}

impl BeaconConfig {
    /// Layers defaults, the optional file and `BEACON_*` environment variables.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("uuid", DEFAULT_IDENTITY.uuid().hyphenated().to_string())?
            .set_default("major", i64::from(DEFAULT_IDENTITY.major))?
            .set_default("minor", i64::from(DEFAULT_IDENTITY.minor))?
            .set_default("measured_power", i64::from(DEFAULT_IDENTITY.measured_power))?
            .set_default("address", None::<String>)?
            .set_default("random_address", false)?
            .set_default("address_kind", "public")?
            .set_default("min_interval_ms", 100)?
            .set_default("max_interval_ms", 100)?
            .set_default("channels", "37,38,39")?
            .set_default("power_level", "medium")?
            .set_default("poll_interval", "100ms")?
            .set_default("radio_timeout", "5s")?
            .set_default("adapter_name", None::<String>)?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // .env files feed the environment source below.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("BEACON").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn identity(&self) -> Result<BeaconIdentity, CodecError> {
        BeaconIdentity::from_uuid_str(&self.uuid, self.major, self.minor, self.measured_power)
    }

    /// Radio parameters without the address; the controller fills that in.
    ///
    /// A generated random address implies `static_random` unless another
    /// kind was configured.
    pub fn advertising_parameters(&self) -> Result<AdvertisingParameters, RadioError> {
        let mut address_kind = self.address_kind;
        if self.random_address && self.address.is_none() && address_kind == AddressKind::Public {
            address_kind = AddressKind::StaticRandom;
        }
        Ok(AdvertisingParameters {
            min_interval_ms: self.min_interval_ms,
            max_interval_ms: self.max_interval_ms,
            channel_map: ChannelMap::from_channels(&self.channels)?,
            power_level: self.power_level,
            address_kind,
            address: None,
        })
    }

    pub fn address_override<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Option<AddressOverride>, CodecError> {
        match &self.address {
            Some(text) => {
                if self.random_address {
                    tracing::warn!("both address and random_address set; using {text}");
                }
                AddressOverride::parse(text).map(Some)
            }
            None if self.random_address => Ok(Some(AddressOverride::random_static(rng))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::env;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F>(vars: &[(&str, &str)], test: F)
    where
        F: FnOnce(),
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut old = Vec::new();
        for (k, v) in vars {
            old.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }

        test();

        for (k, maybe_old) in old {
            match maybe_old {
                Some(val) => env::set_var(k, val),
                None => env::remove_var(k),
            }
        }
    }

    #[test]
    fn defaults_are_applied() {
        with_env(&[], || {
            let cfg = BeaconConfig::load(None).expect("failed to build config");

            assert_eq!(cfg.identity().expect("default uuid"), DEFAULT_IDENTITY);
            assert_eq!(cfg.address, None);
            assert!(!cfg.random_address);
            assert_eq!(cfg.address_kind, AddressKind::Public);
            assert_eq!(cfg.channels, vec![37, 38, 39]);
            assert_eq!(cfg.power_level, PowerLevel::Medium);
            assert_eq!(cfg.poll_interval, Duration::from_millis(100));
            assert_eq!(cfg.radio_timeout, Duration::from_secs(5));
            assert_eq!(cfg.adapter_name, None);
            assert_eq!(
                cfg.advertising_parameters().expect("default parameters"),
                AdvertisingParameters::default()
            );
        });
    }

    #[test]
    fn env_vars_override_defaults() {
        with_env(
            &[
                ("BEACON_UUID", "e2c56db5-dffb-48d2-b060-d0f5a71096e0"),
                ("BEACON_MAJOR", "1"),
                ("BEACON_MINOR", "65535"),
                ("BEACON_MEASURED_POWER", "-70"),
                ("BEACON_ADDRESS_KIND", "static_random"),
                ("BEACON_POWER_LEVEL", "high"),
                ("BEACON_ADAPTER_NAME", "hci1"),
            ],
            || {
                let cfg = BeaconConfig::load(None).expect("failed to build config");
                let identity = cfg.identity().expect("uuid should parse");
                assert_eq!(identity.uuid[0], 0xE2);
                assert_eq!(identity.major, 1);
                assert_eq!(identity.minor, 65535);
                assert_eq!(identity.measured_power, -70);
                assert_eq!(cfg.address_kind, AddressKind::StaticRandom);
                assert_eq!(cfg.power_level, PowerLevel::High);
                assert_eq!(cfg.adapter_name.as_deref(), Some("hci1"));
            },
        );
    }

    #[test]
    fn human_readable_durations_are_parsed() {
        with_env(
            &[
                ("BEACON_POLL_INTERVAL", "250ms"),
                ("BEACON_RADIO_TIMEOUT", "1m"),
            ],
            || {
                let cfg = BeaconConfig::load(None).expect("failed to build config");
                assert_eq!(cfg.poll_interval, Duration::from_millis(250));
                assert_eq!(cfg.radio_timeout, Duration::from_secs(60));
            },
        );
    }

    #[test]
    fn channel_lists_accept_separators_and_single_values() {
        with_env(&[("BEACON_CHANNELS", "37; 39")], || {
            let cfg = BeaconConfig::load(None).expect("failed to build config");
            assert_eq!(cfg.channels, vec![37, 39]);
            let params = cfg.advertising_parameters().expect("valid channels");
            assert_eq!(params.channel_map.channels(), vec![37, 39]);
        });

        with_env(&[("BEACON_CHANNELS", "38")], || {
            let cfg = BeaconConfig::load(None).expect("failed to build config");
            assert_eq!(cfg.channels, vec![38]);
        });
    }

    #[test]
    fn unknown_channel_is_rejected_when_building_parameters() {
        with_env(&[("BEACON_CHANNELS", "37,40")], || {
            let cfg = BeaconConfig::load(None).expect("failed to build config");
            assert!(matches!(
                cfg.advertising_parameters(),
                Err(RadioError::InvalidParameters(_))
            ));
        });
    }

    #[test]
    fn address_override_prefers_explicit_address() {
        with_env(
            &[
                ("BEACON_ADDRESS", "C8:FD:19:A4:A6:F7"),
                ("BEACON_RANDOM_ADDRESS", "true"),
            ],
            || {
                let cfg = BeaconConfig::load(None).expect("failed to build config");
                let mut rng = StdRng::seed_from_u64(7);
                let address = cfg
                    .address_override(&mut rng)
                    .expect("address should parse")
                    .expect("address should be present");
                assert_eq!(address.to_string(), "C8:FD:19:A4:A6:F7");
                assert_eq!(
                    cfg.advertising_parameters()
                        .expect("valid parameters")
                        .address_kind,
                    AddressKind::Public
                );
            },
        );
    }

    #[test]
    fn random_address_switches_to_static_random() {
        with_env(&[("BEACON_RANDOM_ADDRESS", "true")], || {
            let cfg = BeaconConfig::load(None).expect("failed to build config");
            let mut rng = StdRng::seed_from_u64(7);
            let address = cfg
                .address_override(&mut rng)
                .expect("random address")
                .expect("address should be present");
            assert!(address.is_static_random());
            assert_eq!(
                cfg.advertising_parameters()
                    .expect("valid parameters")
                    .address_kind,
                AddressKind::StaticRandom
            );
        });
    }

    #[test]
    fn malformed_address_is_reported() {
        with_env(&[("BEACON_ADDRESS", "not-an-address")], || {
            let cfg = BeaconConfig::load(None).expect("failed to build config");
            let mut rng = StdRng::seed_from_u64(1);
            assert!(matches!(
                cfg.address_override(&mut rng),
                Err(CodecError::InvalidAddress(_))
            ));
        });
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            tmp,
            r#"
major = 42
minor = 7
channels = [37, 38]
poll_interval = "1s"
address = "11:22:33:44:55:66"
"#
        )
        .expect("write to temp file");

        with_env(&[("BEACON_MINOR", "9")], || {
            let cfg = BeaconConfig::load(Some(PathBuf::from(tmp.path()))).expect("load config");
            assert_eq!(cfg.major, 42);
            assert_eq!(cfg.minor, 9);
            assert_eq!(cfg.channels, vec![37, 38]);
            assert_eq!(cfg.poll_interval, Duration::from_secs(1));
            assert_eq!(cfg.address.as_deref(), Some("11:22:33:44:55:66"));
        });
    }
}
