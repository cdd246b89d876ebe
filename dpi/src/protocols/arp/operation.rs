use nom::IResult;
use nom::Parser;
use nom::number::be_u16;
use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt::Formatter;

pub const LENGTH_BYTES: usize = 2;

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u16)]
pub enum Operation {
    Request = 1,
    Reply = 2,

    #[num_enum(catch_all)]
    Unknown(u16),
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request => write!(f, "REQUEST"),
            Self::Reply => write!(f, "REPLY"),
            Self::Unknown(code) => write!(f, "UNKNOWN ({})", code),
        }
    }
}

pub fn parse(input: &[u8]) -> IResult<&[u8], Operation> {
    let (input, number) = be_u16().parse(input)?;

    Ok((input, Operation::from(number)))
}
