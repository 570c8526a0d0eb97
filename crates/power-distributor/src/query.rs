use moteus_multiplex::{
    CanFrame, Command, FrameConfig, MultiplexParser, Resolution, WriteCombiner, WriteFrame,
};
use tracing::debug;

use crate::error::Result;
use crate::register::{Register, State, Unit, MEASUREMENT_BLOCK, STATUS_BLOCK};

/// Decoded board status. Registers missing from a reply keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryResult {
    pub state: State,
    pub fault: u8,
    pub switch_status: bool,
    pub lock_time: f64,
    pub boot_time: f64,
    pub output_voltage: f64,
    pub output_current: f64,
    pub temperature: f64,
    pub energy: f64,
}

impl QueryResult {
    /// Physical value held for a scaled register.
    fn measurement(&self, register: Register) -> Option<f64> {
        match register {
            Register::OutputVoltage => Some(self.output_voltage),
            Register::OutputCurrent => Some(self.output_current),
            Register::Temperature => Some(self.temperature),
            Register::Energy => Some(self.energy),
            _ => None,
        }
    }

    fn measurement_mut(&mut self, register: Register) -> Option<&mut f64> {
        match register {
            Register::OutputVoltage => Some(&mut self.output_voltage),
            Register::OutputCurrent => Some(&mut self.output_current),
            Register::Temperature => Some(&mut self.temperature),
            Register::Energy => Some(&mut self.energy),
            _ => None,
        }
    }
}

/// Resolution requested for each register. `Ignore` registers are not
/// queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryFormat {
    pub state: Resolution,
    pub fault: Resolution,
    pub switch_status: Resolution,
    pub lock_time: Resolution,
    pub boot_time: Resolution,
    pub output_voltage: Resolution,
    pub output_current: Resolution,
    pub temperature: Resolution,
    pub energy: Resolution,
}

impl Default for QueryFormat {
    fn default() -> Self {
        Self {
            state: Resolution::Int8,
            fault: Resolution::Int8,
            switch_status: Resolution::Ignore,
            lock_time: Resolution::Ignore,
            boot_time: Resolution::Ignore,
            output_voltage: Resolution::Float,
            output_current: Resolution::Float,
            temperature: Resolution::Ignore,
            energy: Resolution::Ignore,
        }
    }
}

impl QueryFormat {
    /// Resolutions of [`STATUS_BLOCK`], in address order.
    pub fn status_block(&self) -> [Resolution; 5] {
        [
            self.state,
            self.fault,
            self.switch_status,
            self.lock_time,
            self.boot_time,
        ]
    }

    /// Resolutions of [`MEASUREMENT_BLOCK`], in address order.
    pub fn measurement_block(&self) -> [Resolution; 4] {
        [
            self.output_voltage,
            self.output_current,
            self.temperature,
            self.energy,
        ]
    }
}

/// A query frame ready for the transport.
#[derive(Debug, Clone)]
pub struct EncodedQuery {
    pub frame: WriteFrame,
    /// Value bytes the board will send back.
    pub reply_size: usize,
}

/// Build a query for `format` in a fresh frame.
pub fn make(format: &QueryFormat, config: FrameConfig) -> Result<EncodedQuery> {
    let mut frame = WriteFrame::with_config(config)?;
    let reply_size = make_into(&mut frame, format)?;
    Ok(EncodedQuery { frame, reply_size })
}

/// Append a query for `format` to `frame`, returning the expected reply size.
///
/// On error `frame` is left as it was.
pub fn make_into(frame: &mut WriteFrame, format: &QueryFormat) -> Result<usize> {
    let mark = frame.len();
    let result = write_query(frame, format);
    if result.is_err() {
        frame.truncate(mark);
    }
    result
}

fn write_query(frame: &mut WriteFrame, format: &QueryFormat) -> Result<usize> {
    let status = format.status_block();
    let mut reply_size =
        WriteCombiner::new(frame, Command::Read, Register::State.address(), &status).finish()?;

    let measurements = format.measurement_block();
    reply_size += WriteCombiner::new(
        frame,
        Command::Read,
        Register::OutputVoltage.address(),
        &measurements,
    )
    .finish()?;

    Ok(reply_size)
}

/// Encode the reply a board sends for a `format` query reporting `result`.
pub fn encode_reply(
    result: &QueryResult,
    format: &QueryFormat,
    config: FrameConfig,
) -> Result<WriteFrame> {
    let mut frame = WriteFrame::with_config(config)?;

    let status = format.status_block();
    WriteCombiner::new(&mut frame, Command::Reply, Register::State.address(), &status)
        .write_all(|index, res, frame| write_value(result, STATUS_BLOCK[index], res, frame))?;

    let measurements = format.measurement_block();
    WriteCombiner::new(
        &mut frame,
        Command::Reply,
        Register::OutputVoltage.address(),
        &measurements,
    )
    .write_all(|index, res, frame| write_value(result, MEASUREMENT_BLOCK[index], res, frame))?;

    Ok(frame)
}

fn write_value(
    result: &QueryResult,
    register: Register,
    res: Resolution,
    frame: &mut WriteFrame,
) {
    match register {
        Register::State => frame.write_int(result.state as i32, res),
        Register::Fault => frame.write_int(i32::from(result.fault), res),
        Register::SwitchStatus => frame.write_int(i32::from(result.switch_status), res),
        Register::LockTime => frame.write_int(result.lock_time as i32, res),
        Register::BootTime => frame.write_int(result.boot_time as i32, res),
        scaled => {
            if let Some(value) = result.measurement(scaled) {
                frame.write_mapped(value, scaled.unit().scale(), res);
            }
        }
    }
}

/// Decode a reply buffer.
pub fn parse(data: &[u8]) -> Result<QueryResult> {
    parse_with(&mut MultiplexParser::new(data))
}

/// Decode a received CAN frame.
pub fn parse_frame(frame: &CanFrame) -> Result<QueryResult> {
    parse_with(&mut MultiplexParser::from_frame(frame))
}

/// Decode every register left in `parser`.
///
/// Registers this board map does not know are skipped. A `State` value
/// outside the known states fails the whole decode with
/// [`DistributorError::InvalidState`]; no partial result is returned.
///
/// [`DistributorError::InvalidState`]: crate::DistributorError::InvalidState
pub fn parse_with(parser: &mut MultiplexParser<'_>) -> Result<QueryResult> {
    let mut result = QueryResult::default();

    while let Some(current) = parser.next_field()? {
        let res = current.resolution;
        let Some(register) = Register::from_address(current.register) else {
            debug!(register = current.register, resolution = ?res, "skipping unknown register");
            parser.ignore(res)?;
            continue;
        };

        if register.unit() == Unit::Raw {
            let raw = parser.read_int(res)?;
            match register {
                Register::State => result.state = State::try_from(raw)?,
                Register::Fault => result.fault = raw as u8,
                Register::SwitchStatus => result.switch_status = raw != 0,
                Register::LockTime => result.lock_time = f64::from(raw),
                Register::BootTime => result.boot_time = f64::from(raw),
                _ => {}
            }
            continue;
        }

        let value = parser.read_mapped(res, register.unit().scale())?;
        if let Some(slot) = result.measurement_mut(register) {
            *slot = value;
        }
    }

    Ok(result)
}
