//! 角度归一化

/// 把任意角度（度）映射到 `(-180, 180]`
///
/// 公式为 `((a + 180) mod 360) - 180`，其中 mod 取欧几里得余数（对负数同样返回
/// 非负结果）。公式在奇数倍 180° 处给出 -180，这里按区间定义返回 180。
///
/// 已在区间内的值原样返回，保证幂等：`wrap_angle(wrap_angle(x)) == wrap_angle(x)`。
/// 非有限输入（NaN / ±inf）返回 NaN。
pub fn wrap_angle(angle: f64) -> f64 {
    if angle > -180.0 && angle <= 180.0 {
        return angle;
    }

    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid 可能因舍入返回 360，此时 wrapped == 180，仍在区间内
    if wrapped <= -180.0 { 180.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_angle_examples() {
        assert_eq!(wrap_angle(190.0), -170.0);
        assert_eq!(wrap_angle(-190.0), 170.0);
        assert_eq!(wrap_angle(180.0), 180.0);
        assert_eq!(wrap_angle(-180.0), 180.0);
        assert_eq!(wrap_angle(540.0), 180.0);
        assert_eq!(wrap_angle(720.0), 0.0);
        assert_eq!(wrap_angle(0.0), 0.0);
        assert_eq!(wrap_angle(-0.5), -0.5);
    }

    #[test]
    fn test_wrap_angle_non_finite() {
        assert!(wrap_angle(f64::NAN).is_nan());
        assert!(wrap_angle(f64::INFINITY).is_nan());
    }

    proptest! {
        #[test]
        fn prop_wrap_angle_in_range(x in -1.0e6f64..1.0e6) {
            let w = wrap_angle(x);
            prop_assert!(w > -180.0 && w <= 180.0, "wrap_angle({}) = {}", x, w);
        }

        #[test]
        fn prop_wrap_angle_idempotent(x in -1.0e6f64..1.0e6) {
            let w = wrap_angle(x);
            prop_assert_eq!(wrap_angle(w), w);
        }

        #[test]
        fn prop_wrap_angle_preserves_direction(x in -1.0e4f64..1.0e4) {
            // 与原角度相差 360 的整数倍
            let turns = (x - wrap_angle(x)) / 360.0;
            prop_assert!((turns - turns.round()).abs() < 1e-9);
        }
    }
}
