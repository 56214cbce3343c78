use kaonff::{Cruijff, FitConfiguration, FitMode, FitStatus, Fitter, Float};

const DOMAIN: (Float, Float) = (480.0, 515.0);

fn generate(seed: u64, n_signal: usize, n_background: usize) -> Vec<Float> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let shape = Cruijff::from_slice(&[497.6, 2.0, 2.2, 0.1, 0.1]).unwrap();
    let width = DOMAIN.1 - DOMAIN.0;
    let mut data = Vec::with_capacity(n_signal + n_background);
    while data.len() < n_signal {
        let x = DOMAIN.0 + width * rng.f64();
        if rng.f64() < shape.evaluate(x) {
            data.push(x);
        }
    }
    for _ in 0..n_background {
        data.push(DOMAIN.0 + width * rng.f64());
    }
    data
}

fn peak_configuration() -> FitConfiguration {
    FitConfiguration::new(DOMAIN)
        .with_parameter("n_sig", 900.0, (Some(0.0), None))
        .with_parameter("m", 497.0, (490.0, 505.0))
        .with_parameter("sL", 2.5, (0.5, 10.0))
        .with_parameter("sR", 2.5, (0.5, 10.0))
        .with_parameter("aL", 0.05, (0.0, 0.5))
        .with_parameter("aR", 0.05, (0.0, 0.5))
        .with_parameter("y0", 8.0, (Some(0.0), None))
        .with_parameter("dy", 0.0, (-20.0, 20.0))
}

#[test]
fn recovers_peak_with_background() {
    // y0 = 10 events/MeV over 35 MeV
    let data = generate(7, 1000, 350);
    let mut fitter = Fitter::peak(&data, peak_configuration()).unwrap();
    let result = fitter.fit().unwrap().clone();
    assert!(result.valid, "{}", result.message);
    assert_eq!(fitter.status(), FitStatus::Converged);
    let m = result.value("m").unwrap();
    let sigma_m = result.error("m").unwrap();
    assert!(sigma_m > 0.0 && sigma_m < 1.0);
    assert!((m - 497.6).abs() < 3.0 * sigma_m, "m = {} ± {}", m, sigma_m);
    let n_sig = result.value("n_sig").unwrap();
    assert!((n_sig - 1000.0).abs() < 5.0 * result.error("n_sig").unwrap());
    let covariance = result.covariance.as_ref().unwrap();
    assert_eq!(covariance.len(), 8);

    let sigmas = fitter.sigmas(None).unwrap();
    assert!(!sigmas.contains_key("n_sig"));
    assert_eq!(sigmas.len(), 7);

    let limits = fitter
        .limits(2.0, &["m", "sL"], &Default::default())
        .unwrap();
    let m_limits = limits["m"];
    assert!(m_limits.lower.unwrap() < m && m < m_limits.upper.unwrap());
    assert!(m_limits.upper.unwrap() - m_limits.lower.unwrap() < 4.0 * sigma_m + 1e-9);
    assert_eq!(limits["aL"], peak_configuration().parameters["aL"].bounds);

    let curve = fitter.model_curve(&[480.5, 497.6]).unwrap();
    assert!(curve[1] > curve[0]);
}

#[test]
fn recovers_peak_across_seeds() {
    let recovered = (1..=5)
        .filter(|&seed| {
            let data = generate(seed, 1000, 350);
            let mut fitter = Fitter::peak(&data, peak_configuration()).unwrap();
            let result = fitter.fit().unwrap();
            let m = result.value("m").unwrap();
            let sigma_m = result.error("m").unwrap();
            result.valid && (m - 497.6).abs() < 3.0 * sigma_m
        })
        .count();
    assert!(recovered >= 4, "recovered the peak in {} of 5 samples", recovered);
}

#[test]
fn empty_window_fit_is_invalid() {
    // no event falls inside the fit range, so the shape parameters are unconstrained
    let data = [470.0, 475.0, 520.0];
    let mut fitter = Fitter::peak(&data, peak_configuration()).unwrap();
    let result = fitter.fit().unwrap().clone();
    assert!(!result.valid);
    assert_eq!(fitter.status(), FitStatus::Failed);
    assert!(result.covariance.is_none());
    assert!(result.values.iter().all(|v| v.is_finite()));
    let n_sig = result.value("n_sig").unwrap();
    assert!((0.0..1.0).contains(&n_sig));

    let limits = fitter
        .limits(2.0, &["n_sig", "m", "aL"], &Default::default())
        .unwrap();
    for bounds in limits.values() {
        assert!(bounds.lower.map_or(true, Float::is_finite));
        assert!(bounds.upper.map_or(true, Float::is_finite));
    }
    assert_eq!(limits["m"], peak_configuration().parameters["m"].bounds);
    assert_eq!(limits["n_sig"].lower, Some(0.0));
}

#[test]
fn recovers_signal_only_peak() {
    let data = generate(11, 800, 0);
    let config = FitConfiguration::new(DOMAIN)
        .with_mode(FitMode::SignalOnly)
        .with_parameter("n_sig", 700.0, (Some(0.0), None))
        .with_parameter("m", 498.0, (490.0, 505.0))
        .with_parameter("sL", 2.0, (0.5, 10.0))
        .with_parameter("sR", 2.0, (0.5, 10.0))
        .with_parameter("aL", 0.1, (0.0, 0.5))
        .with_parameter("aR", 0.1, (0.0, 0.5))
        .with_constraint("aL", 0.1, 0.05)
        .with_constraint("aR", 0.1, 0.05);
    let mut fitter = Fitter::peak(&data, config).unwrap();
    assert_eq!(fitter.parameters().len(), 6);
    let result = fitter.fit().unwrap();
    assert!(result.valid);
    let m = result.value("m").unwrap();
    assert!((m - 497.6).abs() < 3.0 * result.error("m").unwrap());
    // every generated event is inside the range, so the yield is close to the sample size
    assert!((result.value("n_sig").unwrap() - 800.0).abs() < 3.0 * Float::sqrt(800.0));
}

#[test]
fn rejects_incomplete_configuration() {
    let config = FitConfiguration::new(DOMAIN)
        .with_parameter("n_sig", 900.0, (Some(0.0), None))
        .with_parameter("m", 497.0, (490.0, 505.0));
    assert!(Fitter::peak(&[497.0], config).is_err());
    let config = peak_configuration().with_constraint("width", 1.0, 1.0);
    assert!(Fitter::peak(&[497.0], config).is_err());
}
