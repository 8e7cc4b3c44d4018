use std::fmt;
use std::ops::Deref;

use nom::bytes::complete::take;
use nom::IResult;

use crate::Error;

macro_rules! var_array {
    ($name:ident, $max:expr) => {
        #[derive(Clone, Copy)]
        pub struct $name([u8; $max], usize);

        impl $name {
            pub const MAX_LEN: usize = $max;

            pub fn empty() -> Self {
                $name([0; $max], 0)
            }

            pub fn try_new(data: &[u8]) -> Result<Self, Error> {
                if data.len() > $max {
                    return Err(Error::IllegalParameter(format!(
                        "Invalid {} length: {} > {}",
                        stringify!($name),
                        data.len(),
                        $max
                    )));
                }
                let mut array = [0; $max];
                array[..data.len()].copy_from_slice(data);
                Ok($name(array, data.len()))
            }

            pub fn serialize(&self, output: &mut Vec<u8>) {
                output.push(self.1 as u8);
                output.extend_from_slice(self);
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:02x?})", stringify!($name), &self.0[..self.1])
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.deref() == other.deref()
            }
        }

        impl Eq for $name {}

        impl Deref for $name {
            type Target = [u8];

            fn deref(&self) -> &Self::Target {
                &self.0[..self.1]
            }
        }

        impl<'a> TryFrom<&'a [u8]> for $name {
            type Error = Error;

            fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }
    };
}

var_array!(SessionId, 32);
var_array!(Cookie, 255);

/// The 32 byte hello random.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Random(pub [u8; 32]);

impl Random {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Random> {
        let (input, bytes) = take(32_usize)(input)?;
        let mut random = [0u8; 32];
        random.copy_from_slice(bytes);
        Ok((input, Random(random)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.0);
    }
}

impl Deref for Random {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_bounds() {
        assert_eq!(SessionId::try_new(&[1; 32]).unwrap().len(), 32);
        assert!(matches!(
            SessionId::try_new(&[1; 33]),
            Err(Error::IllegalParameter(_))
        ));
        assert!(SessionId::empty().is_empty());
    }

    #[test]
    fn cookie_serializes_with_length() {
        let cookie = Cookie::try_new(&[0xBB, 0xCC]).unwrap();
        let mut out = Vec::new();
        cookie.serialize(&mut out);
        assert_eq!(out, [2, 0xBB, 0xCC]);
    }

    #[test]
    fn random_needs_32_bytes() {
        assert!(Random::parse(&[0; 31]).is_err());
        let (rest, random) = Random::parse(&[7; 33]).unwrap();
        assert_eq!(rest, &[7]);
        assert_eq!(random.0, [7; 32]);
    }
}
