//! Element data types and device descriptors carried inline in a tagged value

use core::fmt;

use crate::error::{Error, Result};

/// Type codes of `DataType::code`
pub mod dtype_code {
    pub const INT: u8 = 0;
    pub const UINT: u8 = 1;
    pub const FLOAT: u8 = 2;
    pub const OPAQUE_HANDLE: u8 = 3;
    pub const BFLOAT: u8 = 4;
    pub const COMPLEX: u8 = 5;
    pub const BOOL: u8 = 6;
}

/// Scalar or vector element type
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub code: u8,
    pub bits: u8,
    pub lanes: u16,
}

impl DataType {
    pub const fn new(code: u8, bits: u8, lanes: u16) -> Self {
        Self { code, bits, lanes }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(dtype_code::INT, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(dtype_code::UINT, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(dtype_code::FLOAT, bits, 1)
    }

    pub const fn bfloat16() -> Self {
        Self::new(dtype_code::BFLOAT, 16, 1)
    }

    pub const fn bool() -> Self {
        Self::new(dtype_code::UINT, 1, 1)
    }

    pub const fn handle() -> Self {
        Self::new(dtype_code::OPAQUE_HANDLE, 64, 1)
    }

    pub const fn void() -> Self {
        Self::new(dtype_code::OPAQUE_HANDLE, 0, 0)
    }

    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self::new(self.code, self.bits, lanes)
    }

    pub fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    pub fn is_bool(&self) -> bool {
        (self.code == dtype_code::UINT && self.bits == 1) || self.code == dtype_code::BOOL
    }

    /// Bytes per element (lanes included), rounded up
    pub fn bytes(&self) -> usize {
        (self.bits as usize * self.lanes as usize + 7) / 8
    }

    /// Canonical string form (`int32`, `float16x4`, `bool`, `handle`)
    pub fn to_str(&self) -> Result<String> {
        if *self == Self::void() {
            return Ok("void".to_string());
        }
        if self.is_bool() && self.lanes == 1 {
            return Ok("bool".to_string());
        }
        let prefix = match self.code {
            dtype_code::INT => "int",
            dtype_code::UINT => "uint",
            dtype_code::FLOAT => "float",
            dtype_code::OPAQUE_HANDLE => {
                if self.bits == 64 && self.lanes == 1 {
                    return Ok("handle".to_string());
                }
                "handle"
            }
            dtype_code::BFLOAT => "bfloat",
            dtype_code::COMPLEX => "complex",
            dtype_code::BOOL => "bool",
            other => {
                return Err(Error::value_error(format!("Unknown type code {}", other)));
            }
        };
        let mut text = format!("{}{}", prefix, self.bits);
        if self.lanes != 1 {
            text.push_str(&format!("x{}", self.lanes));
        }
        Ok(text)
    }

    /// Parse the canonical string form
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::value_error(format!("unknown dtype `{}`", text));

        match text {
            "bool" => return Ok(Self::bool()),
            "void" => return Ok(Self::void()),
            "handle" => return Ok(Self::handle()),
            _ => {}
        }

        // Longest prefixes first so "uint" is not read as "int"
        let (code, rest, default_bits) = [
            ("bfloat", dtype_code::BFLOAT, 16u8),
            ("complex", dtype_code::COMPLEX, 64),
            ("handle", dtype_code::OPAQUE_HANDLE, 64),
            ("float", dtype_code::FLOAT, 32),
            ("uint", dtype_code::UINT, 32),
            ("bool", dtype_code::BOOL, 8),
            ("int", dtype_code::INT, 32),
        ]
        .iter()
        .find_map(|(prefix, code, bits)| {
            text.strip_prefix(prefix).map(|rest| (*code, rest, *bits))
        })
        .ok_or_else(invalid)?;

        let (bits_text, lanes_text) = match rest.split_once('x') {
            Some((bits, lanes)) => (bits, Some(lanes)),
            None => (rest, None),
        };

        let bits = if bits_text.is_empty() {
            default_bits
        } else {
            bits_text.parse::<u8>().map_err(|_| invalid())?
        };
        let lanes = match lanes_text {
            Some(lanes) => lanes.parse::<u16>().map_err(|_| invalid())?,
            None => 1,
        };
        if lanes == 0 {
            return Err(invalid());
        }
        Ok(Self::new(code, bits, lanes))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_str() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(
                f,
                "DataType(code={}, bits={}, lanes={})",
                self.code, self.bits, self.lanes
            ),
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

/// Device kinds of `Device::device_type`
pub mod device_type {
    pub const CPU: i32 = 1;
    pub const CUDA: i32 = 2;
    pub const CUDA_HOST: i32 = 3;
    pub const OPENCL: i32 = 4;
    pub const VULKAN: i32 = 7;
    pub const METAL: i32 = 8;
    pub const VPI: i32 = 9;
    pub const ROCM: i32 = 10;
    pub const ROCM_HOST: i32 = 11;
    pub const EXT_DEV: i32 = 12;
    pub const CUDA_MANAGED: i32 = 13;
    pub const ONE_API: i32 = 14;
    pub const WEBGPU: i32 = 15;
    pub const HEXAGON: i32 = 16;
}

/// Device a buffer lives on
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub device_type: i32,
    pub device_id: i32,
}

impl Device {
    pub const fn new(device_type: i32, device_id: i32) -> Self {
        Self {
            device_type,
            device_id,
        }
    }

    pub const fn cpu(device_id: i32) -> Self {
        Self::new(device_type::CPU, device_id)
    }

    pub const fn cuda(device_id: i32) -> Self {
        Self::new(device_type::CUDA, device_id)
    }

    pub fn device_type_name(&self) -> &'static str {
        match self.device_type {
            device_type::CPU => "cpu",
            device_type::CUDA => "cuda",
            device_type::CUDA_HOST => "cuda_host",
            device_type::OPENCL => "opencl",
            device_type::VULKAN => "vulkan",
            device_type::METAL => "metal",
            device_type::VPI => "vpi",
            device_type::ROCM => "rocm",
            device_type::ROCM_HOST => "rocm_host",
            device_type::EXT_DEV => "ext_dev",
            device_type::CUDA_MANAGED => "cuda_managed",
            device_type::ONE_API => "oneapi",
            device_type::WEBGPU => "webgpu",
            device_type::HEXAGON => "hexagon",
            _ => "unknown",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device_type_name(), self.device_id)
    }
}
