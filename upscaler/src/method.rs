use std::fmt;
use std::str::FromStr;

use crate::UpscaleError;

/// How an image gets upscaled, chosen once from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Espcn,
    Edsr,
    Srgan,
    Bilinear,
    Bicubic,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Espcn,
        Method::Edsr,
        Method::Srgan,
        Method::Bilinear,
        Method::Bicubic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Espcn => "espcn",
            Method::Edsr => "edsr",
            Method::Srgan => "srgan",
            Method::Bilinear => "bilinear",
            Method::Bicubic => "bicubic",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = UpscaleError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let lowered = name.to_ascii_lowercase();
        Method::ALL
            .into_iter()
            .find(|method| method.name() == lowered)
            .ok_or_else(|| {
                let supported = Method::ALL.map(Method::name).join(", ");
                UpscaleError::InvalidParameter(format!(
                    "unknown model/method '{name}'; supported: {supported}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("BICUBIC".parse::<Method>().unwrap(), Method::Bicubic);
        assert_eq!("Srgan".parse::<Method>().unwrap(), Method::Srgan);
        for method in Method::ALL {
            assert_eq!(method.name().parse::<Method>().unwrap(), method);
        }
    }

    #[test]
    fn unknown_names_are_parameter_errors() {
        let err = "unknown_model".parse::<Method>().unwrap_err();
        match err {
            UpscaleError::InvalidParameter(detail) => {
                assert_eq!(
                    detail,
                    "unknown model/method 'unknown_model'; supported: espcn, edsr, srgan, bilinear, bicubic"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
