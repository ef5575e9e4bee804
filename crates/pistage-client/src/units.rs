//! 单位换算
//!
//! 位移台的原生单位是毫米（mm）。对外同时提供三套视图：
//!
//! - 原生长度：mm、mm/s
//! - 显示长度：µm、µm/s（×1000）
//! - 光学延迟：fs，由光速和双程因子从长度导出
//!
//! 光学延迟换算：`delay = mm / c × 10¹² × 2`，`c = 299792458.0`。
//! 位移台移动 `x` 时光程变化 `2x`（反射镜双程），所以乘 2。
//!
//! 行程边界在各单位下必须和实时值使用同一组函数换算，
//! 这样 `position_min_fs <= position_fs <= position_max_fs` 始终成立。
//!
//! # 示例
//!
//! ```rust
//! use pistage_client::units::{Millimeter, Micrometer};
//!
//! let x = Millimeter(5.0);
//! assert_eq!(x.to_um(), Micrometer(5000.0));
//! assert!((x.to_fs().to_mm().0 - 5.0).abs() < 1e-12);
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// 真空光速（m/s）
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// 延迟换算的数量级因子
pub const DELAY_SCALE: f64 = 1e12;

/// 双程因子
pub const DOUBLE_PASS: f64 = 2.0;

/// 每毫米的微米数
pub const UM_PER_MM: f64 = 1000.0;

/// mm → µm
#[inline]
pub fn mm_to_um(mm: f64) -> f64 {
    mm * UM_PER_MM
}

/// µm → mm
#[inline]
pub fn um_to_mm(um: f64) -> f64 {
    um / UM_PER_MM
}

/// mm → fs（光学延迟）
#[inline]
pub fn mm_to_fs(mm: f64) -> f64 {
    mm / SPEED_OF_LIGHT * DELAY_SCALE * DOUBLE_PASS
}

/// fs → mm
#[inline]
pub fn fs_to_mm(fs: f64) -> f64 {
    fs * SPEED_OF_LIGHT / DELAY_SCALE / DOUBLE_PASS
}

/// 为长度/速度 NewType 实现通用运算
macro_rules! impl_linear_ops {
    ($ty:ident) => {
        impl $ty {
            /// 零值
            pub const ZERO: Self = $ty(0.0);

            /// 创建新值
            #[inline]
            pub const fn new(value: f64) -> Self {
                $ty(value)
            }

            /// 获取原始值
            #[inline]
            pub fn value(self) -> f64 {
                self.0
            }

            /// 取绝对值
            #[inline]
            pub fn abs(self) -> Self {
                $ty(self.0.abs())
            }

            /// 限制范围
            #[inline]
            pub fn clamp(self, min: Self, max: Self) -> Self {
                $ty(self.0.clamp(min.0, max.0))
            }
        }

        impl Add for $ty {
            type Output = Self;
            #[inline]
            fn add(self, rhs: Self) -> Self {
                $ty(self.0 + rhs.0)
            }
        }

        impl Sub for $ty {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                $ty(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $ty {
            type Output = Self;
            #[inline]
            fn mul(self, rhs: f64) -> Self {
                $ty(self.0 * rhs)
            }
        }

        impl Neg for $ty {
            type Output = Self;
            #[inline]
            fn neg(self) -> Self {
                $ty(-self.0)
            }
        }

        impl AddAssign for $ty {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $ty {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }
    };
}

/// 毫米（NewType，原生单位）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Millimeter(pub f64);

impl_linear_ops!(Millimeter);

impl Millimeter {
    /// 转换为微米
    #[inline]
    pub fn to_um(self) -> Micrometer {
        Micrometer(mm_to_um(self.0))
    }

    /// 转换为光学延迟
    #[inline]
    pub fn to_fs(self) -> Femtosecond {
        Femtosecond(mm_to_fs(self.0))
    }
}

impl fmt::Display for Millimeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} mm", self.0)
    }
}

/// 微米（NewType）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Micrometer(pub f64);

impl_linear_ops!(Micrometer);

impl Micrometer {
    /// 转换为毫米
    #[inline]
    pub fn to_mm(self) -> Millimeter {
        Millimeter(um_to_mm(self.0))
    }

    /// 转换为光学延迟
    #[inline]
    pub fn to_fs(self) -> Femtosecond {
        self.to_mm().to_fs()
    }
}

impl fmt::Display for Micrometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} µm", self.0)
    }
}

/// 飞秒（NewType，光学延迟）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Femtosecond(pub f64);

impl_linear_ops!(Femtosecond);

impl Femtosecond {
    /// 转换为毫米
    #[inline]
    pub fn to_mm(self) -> Millimeter {
        Millimeter(fs_to_mm(self.0))
    }

    /// 转换为微米
    #[inline]
    pub fn to_um(self) -> Micrometer {
        self.to_mm().to_um()
    }
}

impl fmt::Display for Femtosecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} fs", self.0)
    }
}

/// 毫米每秒（NewType，原生速度单位）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MillimeterPerSecond(pub f64);

impl_linear_ops!(MillimeterPerSecond);

impl MillimeterPerSecond {
    /// 转换为 µm/s
    #[inline]
    pub fn to_umps(self) -> MicrometerPerSecond {
        MicrometerPerSecond(mm_to_um(self.0))
    }
}

impl fmt::Display for MillimeterPerSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} mm/s", self.0)
    }
}

/// 微米每秒（NewType）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicrometerPerSecond(pub f64);

impl_linear_ops!(MicrometerPerSecond);

impl MicrometerPerSecond {
    /// 转换为 mm/s
    #[inline]
    pub fn to_mmps(self) -> MillimeterPerSecond {
        MillimeterPerSecond(um_to_mm(self.0))
    }
}

impl fmt::Display for MicrometerPerSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} µm/s", self.0)
    }
}

impl From<Micrometer> for Millimeter {
    fn from(value: Micrometer) -> Self {
        value.to_mm()
    }
}

impl From<Femtosecond> for Millimeter {
    fn from(value: Femtosecond) -> Self {
        value.to_mm()
    }
}

impl From<Millimeter> for Micrometer {
    fn from(value: Millimeter) -> Self {
        value.to_um()
    }
}

impl From<Millimeter> for Femtosecond {
    fn from(value: Millimeter) -> Self {
        value.to_fs()
    }
}

impl From<MicrometerPerSecond> for MillimeterPerSecond {
    fn from(value: MicrometerPerSecond) -> Self {
        value.to_mmps()
    }
}

impl From<MillimeterPerSecond> for MicrometerPerSecond {
    fn from(value: MillimeterPerSecond) -> Self {
        value.to_umps()
    }
}
