//! Unit tests for masfro-risk.

mod hydrological {
    use crate::hydrological_risk;

    #[test]
    fn dry_road_is_zero() {
        assert_eq!(hydrological_risk(0.0, 0.0), 0.0);
        assert_eq!(hydrological_risk(-0.5, 2.0), 0.0);
    }

    #[test]
    fn piecewise_band_edges() {
        // E = 0.3 → exactly 0.4; E = 0.6 → exactly 0.7; E ≥ 1.0 → 1.0.
        assert!((hydrological_risk(0.3, 0.0) - 0.4).abs() < 1e-6);
        assert!((hydrological_risk(0.6, 0.0) - 0.7).abs() < 1e-6);
        assert_eq!(hydrological_risk(1.0, 0.0), 1.0);
        assert_eq!(hydrological_risk(3.0, 0.0), 1.0);
    }

    #[test]
    fn velocity_head_raises_risk() {
        // 0.25 m static vs. 0.25 m flowing at 2 m/s (velocity head ≈ 0.204 m).
        let still = hydrological_risk(0.25, 0.0);
        let flowing = hydrological_risk(0.25, 2.0);
        assert!(flowing > still);
    }

    #[test]
    fn monotone_in_depth() {
        let mut last = 0.0;
        for i in 0..50 {
            let r = hydrological_risk(i as f32 * 0.05, 0.0);
            assert!(r >= last, "not monotone at depth {}", i as f32 * 0.05);
            last = r;
        }
    }
}

mod infrastructure {
    use crate::infrastructure_risk;
    use masfro_core::HighwayClass;

    #[test]
    fn dry_road_keeps_base_vulnerability() {
        assert!((infrastructure_risk(HighwayClass::Motorway, 0.0) - 0.1).abs() < 1e-6);
        assert!((infrastructure_risk(HighwayClass::Residential, 0.0) - 0.5).abs() < 1e-6);
        assert!((infrastructure_risk(HighwayClass::Service, 0.0) - 0.5).abs() < 1e-6);
        assert!((infrastructure_risk(HighwayClass::Unclassified, 0.0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn depth_multiplier_caps_at_double() {
        let shallow = infrastructure_risk(HighwayClass::Secondary, 0.5);
        let deep = infrastructure_risk(HighwayClass::Secondary, 2.0);
        let deeper = infrastructure_risk(HighwayClass::Secondary, 10.0);
        assert!(deep > shallow);
        assert_eq!(deep, deeper); // multiplier saturates at 2×
    }

    #[test]
    fn never_exceeds_one() {
        assert!(infrastructure_risk(HighwayClass::Unclassified, 10.0) <= 1.0);
    }
}

mod composite {
    use crate::composite_risk;

    #[test]
    fn weighted_sum() {
        let risk = composite_risk(1.0, 1.0, 1.0, 1.0);
        assert_eq!(risk, 1.0);
        let risk = composite_risk(0.8, 0.4, 0.2, 0.0);
        assert!((risk - (0.8 * 0.5 + 0.4 * 0.25 + 0.2 * 0.15)).abs() < 1e-6);
    }

    #[test]
    fn clamped() {
        assert_eq!(composite_risk(0.0, 0.0, 0.0, 0.0), 0.0);
    }
}

mod depth_to_risk {
    use crate::depth_to_risk;

    #[test]
    fn linear_below_point_six() {
        assert_eq!(depth_to_risk(0.0), 0.0);
        assert!((depth_to_risk(0.25) - 0.25).abs() < 1e-6);
        assert!((depth_to_risk(0.6) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn compressed_above_point_six() {
        assert!((depth_to_risk(1.0) - 0.8).abs() < 1e-6);
        assert!((depth_to_risk(2.0) - 1.0).abs() < 1e-6);
        assert_eq!(depth_to_risk(5.0), 1.0);
    }

    #[test]
    fn monotone_non_decreasing() {
        let mut last = 0.0;
        for i in 0..=60 {
            let r = depth_to_risk(i as f32 * 0.05);
            assert!(r >= last);
            last = r;
        }
    }
}

mod decay {
    use crate::temporal_decay;

    #[test]
    fn half_life_halves() {
        assert!((temporal_decay(0.8, 1_800.0, 1_800.0) - 0.4).abs() < 1e-6);
        assert!((temporal_decay(0.8, 3_600.0, 1_800.0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn fresh_signal_undamped() {
        assert_eq!(temporal_decay(0.7, 0.0, 1_800.0), 0.7);
    }

    #[test]
    fn future_observation_clamped_to_fresh() {
        // Negative age (clock skew) must not amplify the signal.
        assert_eq!(temporal_decay(0.7, -600.0, 1_800.0), 0.7);
    }

    #[test]
    fn zero_half_life_kills_signal() {
        assert_eq!(temporal_decay(0.9, 100.0, 0.0), 0.0);
    }
}

mod passability {
    use crate::passability;
    use masfro_core::VehicleType;

    #[test]
    fn dry_road_always_passable() {
        for vehicle in [VehicleType::Car, VehicleType::Suv, VehicleType::Truck] {
            let p = passability(0.0, 0.0, vehicle);
            assert!(p.passable);
            assert_eq!(p.confidence, 1.0);
        }
    }

    #[test]
    fn car_static_threshold() {
        assert!(passability(0.29, 0.0, VehicleType::Car).passable);
        assert!(!passability(0.31, 0.0, VehicleType::Car).passable);
    }

    #[test]
    fn truck_wades_deeper_than_car() {
        let depth = 0.45;
        assert!(!passability(depth, 0.0, VehicleType::Car).passable);
        assert!(passability(depth, 0.0, VehicleType::Truck).passable);
    }

    #[test]
    fn flowing_water_tightens_limits() {
        // Passable as static, dangerous once the flow is fast.
        assert!(passability(0.35, 0.3, VehicleType::Car).passable);
        assert!(!passability(0.35, 0.8, VehicleType::Car).passable);
    }
}

mod travel_time {
    use crate::travel_time_adjustment;

    #[test]
    fn curve_bands() {
        assert_eq!(travel_time_adjustment(10.0, 0.0), 10.0);
        assert!((travel_time_adjustment(10.0, 0.3) - 11.0).abs() < 1e-4);
        assert!((travel_time_adjustment(10.0, 0.6) - 13.0).abs() < 1e-4);
        assert!((travel_time_adjustment(10.0, 1.0) - 15.0).abs() < 1e-4);
    }

    #[test]
    fn monotone_in_risk() {
        let mut last = 0.0;
        for i in 0..=20 {
            let t = travel_time_adjustment(10.0, i as f32 * 0.05);
            assert!(t >= last);
            last = t;
        }
    }
}

mod category {
    use crate::RiskCategory;

    #[test]
    fn bands() {
        assert_eq!(RiskCategory::of(0.1), RiskCategory::Safe);
        assert_eq!(RiskCategory::of(0.3), RiskCategory::Low);
        assert_eq!(RiskCategory::of(0.5), RiskCategory::Moderate);
        assert_eq!(RiskCategory::of(0.7), RiskCategory::High);
        assert_eq!(RiskCategory::of(0.95), RiskCategory::Critical);
    }
}
