// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Normative type definitions.
//!
//! Canonical structures exchanged by network clients and servers, layered
//! on the [`crate::TypeDef`] builder so callers can append site-specific
//! fields before instantiating.

use crate::builder::{members as m, Member, TypeDef};
use crate::error::Result;
use crate::typecode::TypeCode;
use crate::value::MutValue;

/// The standard `time_t` group: seconds, nanoseconds, user tag.
pub fn time_t(name: impl Into<String>) -> Member {
    m::struct_(
        name,
        "time_t",
        vec![
            m::int64("secondsPastEpoch"),
            m::int32("nanoseconds"),
            m::int32("userTag"),
        ],
    )
}

/// The standard `alarm_t` group: severity, status, message.
pub fn alarm_t(name: impl Into<String>) -> Member {
    m::struct_(
        name,
        "alarm_t",
        vec![
            m::int32("severity"),
            m::int32("status"),
            m::string("message"),
        ],
    )
}

/// A scalar, or array of scalars, with meta-data.
///
/// ```rust
/// use rpva_data::{nt::NtScalar, TypeCode};
///
/// let mut value = NtScalar::new(TypeCode::Float64).create()?;
/// value.set("value", 4.2f64)?;
/// value.set("alarm.severity", 0i32)?;
/// # Ok::<(), rpva_data::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct NtScalar {
    /// Type of the `value` field.
    pub value: TypeCode,
    /// Include display (range) meta-data.
    pub display: bool,
    /// Include control (range) meta-data.
    pub control: bool,
    /// Include alarm (range) meta-data.
    pub value_alarm: bool,
}

impl NtScalar {
    pub fn new(value: TypeCode) -> NtScalar {
        NtScalar {
            value,
            display: false,
            control: false,
            value_alarm: false,
        }
    }

    /// A definition which can still be appended to.
    pub fn build(&self) -> TypeDef {
        let id = if self.value.is_array() {
            "epics:nt/NTScalarArray:1.0"
        } else {
            "epics:nt/NTScalar:1.0"
        };
        let mut def = TypeDef::compound(
            TypeCode::Struct,
            id,
            vec![
                Member::new(self.value, "value"),
                alarm_t("alarm"),
                time_t("timeStamp"),
            ],
        );
        if self.display {
            def.push(m::struct_(
                "display",
                "display_t",
                vec![
                    m::float64("limitLow"),
                    m::float64("limitHigh"),
                    m::string("description"),
                    m::string("units"),
                ],
            ));
        }
        if self.control {
            def.push(m::struct_(
                "control",
                "control_t",
                vec![
                    m::float64("limitLow"),
                    m::float64("limitHigh"),
                    m::float64("minStep"),
                ],
            ));
        }
        if self.value_alarm {
            def.push(m::struct_(
                "valueAlarm",
                "valueAlarm_t",
                vec![
                    m::boolean("active"),
                    m::float64("lowAlarmLimit"),
                    m::float64("lowWarningLimit"),
                    m::float64("highWarningLimit"),
                    m::float64("highAlarmLimit"),
                ],
            ));
        }
        def
    }

    /// Instantiate.
    pub fn create(&self) -> Result<MutValue> {
        self.build().create()
    }
}
