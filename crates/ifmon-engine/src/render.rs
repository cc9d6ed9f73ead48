//! Human rendering of bandwidth, percentages and packet rates.
//!
//! All engine-internal values are bytes per second; these helpers scale to
//! the display unit at the last moment.

const SI_PREFIXES: [&str; 5] = ["", "k", "M", "G", "T"];

/// Render a byte rate as a network speed in bits per second.
///
/// ```
/// use ifmon_engine::render::nicspeed;
///
/// assert_eq!(nicspeed(125000.0), "1 MBit/s");
/// assert_eq!(nicspeed(1250.0), "10 kBit/s");
/// assert_eq!(nicspeed(312500.0), "2.5 MBit/s");
/// ```
pub fn nicspeed(bytes_per_sec: f64) -> String {
    let (scaled, prefix) = scale_si(bytes_per_sec * 8.0);
    format!("{} {}Bit/s", trim_decimals(scaled, 2), prefix)
}

/// Render a byte rate as I/O bandwidth.
///
/// ```
/// use ifmon_engine::render::iobandwidth;
///
/// assert_eq!(iobandwidth(1000000.0), "1.00 MB/s");
/// assert_eq!(iobandwidth(512.0), "512.00 B/s");
/// ```
pub fn iobandwidth(bytes_per_sec: f64) -> String {
    let (scaled, prefix) = scale_si(bytes_per_sec);
    format!("{scaled:.2} {prefix}B/s")
}

/// Render a percentage with one decimal.
///
/// ```
/// use ifmon_engine::render::percent;
///
/// assert_eq!(percent(10.0), "10.0%");
/// assert_eq!(percent(0.05), "0.1%");
/// ```
pub fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Render a floating point value to the given precision, dropping trailing
/// zeros, appending the unit. Values too small for the precision render as
/// a bound.
///
/// ```
/// use ifmon_engine::render::floating_point;
///
/// assert_eq!(floating_point(3.141593, 3, " rad"), "3.142 rad");
/// assert_eq!(floating_point(-0.0001, 3, "%"), ">-0.001%");
/// assert_eq!(floating_point(100.0, 3, "%"), "100%");
/// ```
pub fn floating_point(value: f64, precision: usize, unit: &str) -> String {
    if value.round() == value {
        return format!("{value:.0}{unit}");
    }

    let tolerance = 10f64.powi(-(precision as i32));
    if value.abs() < tolerance {
        let bound = format!("{tolerance:.precision$}");
        return if value > 0.0 {
            format!("<{bound}{unit}")
        } else {
            format!(">-{bound}{unit}")
        };
    }

    let mut text = format!("{value:.precision$}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    format!("{text}{unit}")
}

/// Render a packet rate.
///
/// ```
/// use ifmon_engine::render::packet_rate;
///
/// assert_eq!(packet_rate(0.5), "0.5 packets/s");
/// assert_eq!(packet_rate(4.0), "4 packets/s");
/// ```
pub fn packet_rate(value: f64) -> String {
    floating_point(value, 2, " packets/s")
}

fn scale_si(mut value: f64) -> (f64, &'static str) {
    let mut idx = 0;
    while value.abs() >= 1000.0 && idx < SI_PREFIXES.len() - 1 {
        value /= 1000.0;
        idx += 1;
    }
    (value, SI_PREFIXES[idx])
}

fn trim_decimals(value: f64, precision: usize) -> String {
    let mut text = format!("{value:.precision$}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}
