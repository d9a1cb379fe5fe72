//! # Giorgio CLI
//!
//! FCA Giorgio 平台 CAN 翻译层的命令行工具。
//!
//! 不连接真实总线：所有命令都在本地运行控制器与编解码。
//!
//! ```bash
//! # 按场景文件逐周期运行控制器，打印输出帧并录制
//! giorgio-cli simulate --scenario scenarios/cancel_pulse.toml --record out.jsonl
//!
//! # 计算/校验一帧的校验和
//! giorgio-cli checksum --address 0x1F6 --data 0102030405060700
//!
//! # 解码一帧
//! giorgio-cli decode --address 0x2FA --data 000300
//!
//! # 检查录制结果
//! giorgio-cli inspect --log out.jsonl --message ACC_BUTTON
//!
//! # 打印默认参数（可作为 --params 的起点）
//! giorgio-cli params
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ChecksumCommand, DecodeCommand, InspectCommand, ParamsCommand, SimulateCommand};

/// Giorgio CLI - CAN 翻译层命令行工具
#[derive(Parser, Debug)]
#[command(name = "giorgio-cli")]
#[command(about = "Command-line interface for the FCA Giorgio CAN translator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 按场景文件运行控制器
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 计算或校验帧校验和
    Checksum {
        #[command(flatten)]
        args: ChecksumCommand,
    },

    /// 按报文表解码一帧
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },

    /// 检查录制的帧日志
    Inspect {
        #[command(flatten)]
        args: InspectCommand,
    },

    /// 打印控制器参数
    Params {
        #[command(flatten)]
        args: ParamsCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("giorgio_cli=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { args } => args.execute(),
        Commands::Checksum { args } => args.execute(),
        Commands::Decode { args } => args.execute(),
        Commands::Inspect { args } => args.execute(),
        Commands::Params { args } => args.execute(),
    }
}
