//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 控制器未连接
    #[error("Controller not connected")]
    NotConnected,

    /// 建立连接失败（找不到控制器、设备被占用等）
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// 控制器上报的 GCS 错误码
    #[error("Controller error {code}: {message}")]
    Controller {
        /// GCS 错误码
        code: i32,
        /// 错误描述
        message: String,
    },

    /// 无效输入（如 NaN 目标位置）
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// 控制器错误码（非控制器错误返回 `None`）
    pub fn controller_code(&self) -> Option<i32> {
        match self {
            DriverError::Controller { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DriverError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let msg = format!("{}", DriverError::NotConnected);
        assert_eq!(msg, "Controller not connected");

        let msg = format!("{}", DriverError::ConnectionFailed("117018374".to_string()));
        assert!(msg.contains("Connection failed") && msg.contains("117018374"));

        let err = DriverError::Controller {
            code: 7,
            message: "Position out of limits".to_string(),
        };
        assert_eq!(format!("{}", err), "Controller error 7: Position out of limits");

        let msg = format!("{}", DriverError::InvalidInput("NaN".to_string()));
        assert!(msg.contains("Invalid input") && msg.contains("NaN"));
    }

    /// 测试 From<std::io::Error> 转换
    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::TimedOut, "serial read");
        let driver_error: DriverError = io_error.into();
        match driver_error {
            DriverError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_controller_code() {
        let err = DriverError::Controller {
            code: 17,
            message: "Parameter out of range".to_string(),
        };
        assert_eq!(err.controller_code(), Some(17));
        assert_eq!(DriverError::NotConnected.controller_code(), None);
    }
}
