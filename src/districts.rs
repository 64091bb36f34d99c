use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const LABELS: [&str; 5] = [
    "Work Completed",
    "Funds Used",
    "Active Workers",
    "Ongoing Works",
    "New Projects",
];

/// One colour per bar, aligned with [`LABELS`].
pub const BAR_COLORS: [&str; 5] = ["#4CAF50", "#2196F3", "#FFC107", "#FF5722", "#9C27B0"];

pub const BAR_RADIUS: u8 = 10;

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default, Debug)]
pub enum District {
    #[default]
    Madurai,
    Salem,
    Theni,
    Dindigul,
}

impl District {
    pub const ALL: [District; 4] = [
        District::Madurai,
        District::Salem,
        District::Theni,
        District::Dindigul,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            District::Madurai => "Madurai",
            District::Salem => "Salem",
            District::Theni => "Theni",
            District::Dindigul => "Dindigul",
        }
    }

    /// Performance row of the district, aligned with [`LABELS`].
    pub fn performance(&self) -> [u32; 5] {
        match self {
            District::Madurai => [65, 78, 90, 80, 85],
            District::Salem => [55, 68, 72, 69, 80],
            District::Theni => [45, 60, 58, 62, 70],
            District::Dindigul => [70, 82, 88, 79, 91],
        }
    }

    pub fn chart(&self) -> Chart {
        Chart {
            data: ChartData {
                labels: LABELS,
                datasets: vec![Dataset {
                    label: format!("{} Performance", self.name()),
                    data: self.performance(),
                    background_color: BAR_COLORS,
                    border_radius: BAR_RADIUS,
                }],
            },
            options: ChartOptions::titled(format!("{} District Progress", self.name())),
        }
    }
}

impl fmt::Display for District {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for District {
    type Err = UnknownDistrictErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        District::ALL
            .into_iter()
            .find(|district| district.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownDistrictErr(s.to_string()))
    }
}

/* -------------------------------------------------------------------------- */
/*                                Chart Payload                               */
/* -------------------------------------------------------------------------- */

/// Everything a bar chart library needs to draw the selected district.
#[derive(Serialize, Debug)]
pub struct Chart {
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Serialize, Debug)]
pub struct ChartData {
    pub labels: [&'static str; 5],
    pub datasets: Vec<Dataset>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: [u32; 5],
    pub background_color: [&'static str; 5],
    pub border_radius: u8,
}

#[derive(Serialize, Debug)]
pub struct ChartOptions {
    pub responsive: bool,
    pub plugins: ChartPlugins,
}

#[derive(Serialize, Debug)]
pub struct ChartPlugins {
    pub legend: Legend,
    pub title: Title,
}

#[derive(Serialize, Debug)]
pub struct Legend {
    pub position: &'static str,
}

#[derive(Serialize, Debug)]
pub struct Title {
    pub display: bool,
    pub text: String,
    pub font: Font,
}

#[derive(Serialize, Debug)]
pub struct Font {
    pub size: u8,
}

impl ChartOptions {
    fn titled(text: String) -> Self {
        ChartOptions {
            responsive: true,
            plugins: ChartPlugins {
                legend: Legend { position: "top" },
                title: Title {
                    display: true,
                    text,
                    font: Font { size: 18 },
                },
            },
        }
    }
}

/* --------------------------------- Errors --------------------------------- */

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownDistrictErr(pub String);

impl fmt::Display for UnknownDistrictErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown district - {}", self.0)
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_district_parse() {
        assert_eq!("Madurai".parse::<District>(), Ok(District::Madurai));
        assert_eq!("salem".parse::<District>(), Ok(District::Salem));
        assert_eq!(" Theni ".parse::<District>(), Ok(District::Theni));
        assert_eq!("DINDIGUL".parse::<District>(), Ok(District::Dindigul));
    }

    #[test]
    fn test_district_parse_unknown() {
        assert_eq!(
            "Chennai".parse::<District>(),
            Err(UnknownDistrictErr("Chennai".to_string()))
        );
        assert!("".parse::<District>().is_err());
    }

    #[test]
    fn test_default_district_is_madurai() {
        assert_eq!(District::default(), District::Madurai);
    }

    #[test]
    fn test_performance_table() {
        assert_eq!(District::Madurai.performance(), [65, 78, 90, 80, 85]);
        assert_eq!(District::Salem.performance(), [55, 68, 72, 69, 80]);
        assert_eq!(District::Theni.performance(), [45, 60, 58, 62, 70]);
        assert_eq!(District::Dindigul.performance(), [70, 82, 88, 79, 91]);
    }

    #[test]
    fn test_chart_payload() {
        let chart = serde_json::to_value(District::Salem.chart()).unwrap();

        assert_eq!(chart["data"]["labels"][0], "Work Completed");
        assert_eq!(chart["data"]["labels"][4], "New Projects");

        let dataset = &chart["data"]["datasets"][0];
        assert_eq!(dataset["label"], "Salem Performance");
        assert_eq!(dataset["data"], serde_json::json!([55, 68, 72, 69, 80]));
        assert_eq!(dataset["backgroundColor"][0], "#4CAF50");
        assert_eq!(dataset["borderRadius"], 10);

        assert_eq!(chart["options"]["responsive"], true);
        assert_eq!(chart["options"]["plugins"]["legend"]["position"], "top");
        assert_eq!(
            chart["options"]["plugins"]["title"]["text"],
            "Salem District Progress"
        );
        assert_eq!(chart["options"]["plugins"]["title"]["font"]["size"], 18);
    }
}
