//! 控制层错误类型定义

use giorgio_protocol::ProtocolError;
use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CarError {
    /// 协议错误（未知报文/字段、数值越界）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 参数配置错误
    ///
    /// 会话启动时暴露，不在周期内恢复。
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 内部不变量被破坏
    ///
    /// 属于程序缺陷，本次会话应当终止。
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use super::CarError;
    use giorgio_protocol::ProtocolError;

    #[test]
    fn test_car_error_display() {
        let err = CarError::from(ProtocolError::UnknownMessage {
            name: "FOO".to_string(),
        });
        assert_eq!(format!("{}", err), "Protocol error: Unknown message: FOO");

        let err = CarError::Config("steer_step must be > 0".to_string());
        assert!(format!("{}", err).contains("steer_step"));
    }

    #[test]
    fn test_car_error_from_protocol() {
        let protocol_error = ProtocolError::InvalidBus { bus: 7 };
        let err: CarError = protocol_error.clone().into();
        assert_eq!(err, CarError::Protocol(protocol_error));
    }
}
