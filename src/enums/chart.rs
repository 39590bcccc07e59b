//! Enumerations used by charts and related objects.

use super::EnumError;
use phf::phf_map;

ms_enum! {
    /// Specifies the type of a chart.
    ///
    /// Corresponds to the VBA `XlChartType` enumeration.
    ///
    /// # Examples
    ///
    /// ```
    /// use pptx_opc::enums::XlChartType;
    ///
    /// assert_eq!(XlChartType::BarStacked.value(), 58);
    /// assert_eq!(XlChartType::from_value(-4169), Some(XlChartType::XyScatter));
    /// ```
    pub enum XlChartType ("XlChartType", "http://msdn.microsoft.com/en-us/library/office/ff838409.aspx") {
        ThreeDArea = -4098, "3D Area.";
        ThreeDAreaStacked = 78, "3D Stacked Area.";
        ThreeDAreaStacked100 = 79, "100% Stacked Area.";
        ThreeDBarClustered = 60, "3D Clustered Bar.";
        ThreeDBarStacked = 61, "3D Stacked Bar.";
        ThreeDBarStacked100 = 62, "3D 100% Stacked Bar.";
        ThreeDColumn = -4100, "3D Column.";
        ThreeDColumnClustered = 54, "3D Clustered Column.";
        ThreeDColumnStacked = 55, "3D Stacked Column.";
        ThreeDColumnStacked100 = 56, "3D 100% Stacked Column.";
        ThreeDLine = -4101, "3D Line.";
        ThreeDPie = -4102, "3D Pie.";
        ThreeDPieExploded = 70, "Exploded 3D Pie.";
        Area = 1, "Area";
        AreaStacked = 76, "Stacked Area.";
        AreaStacked100 = 77, "100% Stacked Area.";
        BarClustered = 57, "Clustered Bar.";
        BarOfPie = 71, "Bar of Pie.";
        BarStacked = 58, "Stacked Bar.";
        BarStacked100 = 59, "100% Stacked Bar.";
        Bubble = 15, "Bubble.";
        BubbleThreeDEffect = 87, "Bubble with 3D effects.";
        ColumnClustered = 51, "Clustered Column.";
        ColumnStacked = 52, "Stacked Column.";
        ColumnStacked100 = 53, "100% Stacked Column.";
        ConeBarClustered = 102, "Clustered Cone Bar.";
        ConeBarStacked = 103, "Stacked Cone Bar.";
        ConeBarStacked100 = 104, "100% Stacked Cone Bar.";
        ConeCol = 105, "3D Cone Column.";
        ConeColClustered = 99, "Clustered Cone Column.";
        ConeColStacked = 100, "Stacked Cone Column.";
        ConeColStacked100 = 101, "100% Stacked Cone Column.";
        CylinderBarClustered = 95, "Clustered Cylinder Bar.";
        CylinderBarStacked = 96, "Stacked Cylinder Bar.";
        CylinderBarStacked100 = 97, "100% Stacked Cylinder Bar.";
        CylinderCol = 98, "3D Cylinder Column.";
        CylinderColClustered = 92, "Clustered Cone Column.";
        CylinderColStacked = 93, "Stacked Cone Column.";
        CylinderColStacked100 = 94, "100% Stacked Cylinder Column.";
        Doughnut = -4120, "Doughnut.";
        DoughnutExploded = 80, "Exploded Doughnut.";
        Line = 4, "Line.";
        LineMarkers = 65, "Line with Markers.";
        LineMarkersStacked = 66, "Stacked Line with Markers.";
        LineMarkersStacked100 = 67, "100% Stacked Line with Markers.";
        LineStacked = 63, "Stacked Line.";
        LineStacked100 = 64, "100% Stacked Line.";
        Pie = 5, "Pie.";
        PieExploded = 69, "Exploded Pie.";
        PieOfPie = 68, "Pie of Pie.";
        PyramidBarClustered = 109, "Clustered Pyramid Bar.";
        PyramidBarStacked = 110, "Stacked Pyramid Bar.";
        PyramidBarStacked100 = 111, "100% Stacked Pyramid Bar.";
        PyramidCol = 112, "3D Pyramid Column.";
        PyramidColClustered = 106, "Clustered Pyramid Column.";
        PyramidColStacked = 107, "Stacked Pyramid Column.";
        PyramidColStacked100 = 108, "100% Stacked Pyramid Column.";
        Radar = -4151, "Radar.";
        RadarFilled = 82, "Filled Radar.";
        RadarMarkers = 81, "Radar with Data Markers.";
        StockHlc = 88, "High-Low-Close.";
        StockOhlc = 89, "Open-High-Low-Close.";
        StockVhlc = 90, "Volume-High-Low-Close.";
        StockVohlc = 91, "Volume-Open-High-Low-Close.";
        Surface = 83, "3D Surface.";
        SurfaceTopView = 85, "Surface (Top View).";
        SurfaceTopViewWireframe = 86, "Surface (Top View wireframe).";
        SurfaceWireframe = 84, "3D Surface (wireframe).";
        XyScatter = -4169, "Scatter.";
        XyScatterLines = 74, "Scatter with Lines.";
        XyScatterLinesNoMarkers = 75, "Scatter with Lines and No Data Markers.";
        XyScatterSmooth = 72, "Scatter with Smoothed Lines.";
        XyScatterSmoothNoMarkers = 73, "Scatter with Smoothed Lines and No Data Markers.";
    }
}

ms_enum! {
    /// Specifies the position of the legend on a chart.
    ///
    /// Corresponds to the VBA `XlLegendPosition` enumeration.
    pub enum XlLegendPosition ("XlLegendPosition", "http://msdn.microsoft.com/en-us/library/office/ff745840.aspx") {
        Bottom = -4107, "Below the chart.";
        Corner = 2, "In the upper-right corner of the chart border.";
        Custom = -4161, "A custom position.";
        Left = -4131, "Left of the chart.";
        Right = -4152, "Right of the chart.";
        Top = -4160, "Above the chart.";
    }
}

static LEGEND_POSITION_XML: phf::Map<&'static str, XlLegendPosition> = phf_map! {
    "b" => XlLegendPosition::Bottom,
    "tr" => XlLegendPosition::Corner,
    "l" => XlLegendPosition::Left,
    "r" => XlLegendPosition::Right,
    "t" => XlLegendPosition::Top,
};

impl XlLegendPosition {
    /// Convert the position to its `c:legendPos/@val` value.
    ///
    /// `Custom` is only ever reported by the object model and has no XML form.
    pub fn to_xml(self) -> Result<&'static str, EnumError> {
        match self {
            Self::Bottom => Ok("b"),
            Self::Corner => Ok("tr"),
            Self::Left => Ok("l"),
            Self::Right => Ok("r"),
            Self::Top => Ok("t"),
            Self::Custom => Err(EnumError::NotXmlMapped {
                enum_name: Self::MS_NAME,
                member: "Custom",
            }),
        }
    }

    /// Parse a position from its XML attribute value.
    pub fn from_xml(s: &str) -> Result<Self, EnumError> {
        LEGEND_POSITION_XML
            .get(s)
            .copied()
            .ok_or_else(|| EnumError::UnknownXmlValue {
                enum_name: Self::MS_NAME,
                value: s.to_string(),
            })
    }
}

ms_enum! {
    /// Specifies a type of axis tick for a chart.
    ///
    /// Corresponds to the VBA `XlTickMark` enumeration.
    ///
    /// # Examples
    ///
    /// ```
    /// use pptx_opc::enums::XlTickMark;
    ///
    /// assert_eq!(XlTickMark::Outside.to_xml().unwrap(), "out");
    /// assert_eq!(XlTickMark::from_xml("cross").unwrap(), XlTickMark::Cross);
    /// ```
    pub enum XlTickMark ("XlTickMark", "http://msdn.microsoft.com/en-us/library/office/ff193878.aspx") {
        Cross = 4, "Tick mark crosses the axis";
        Inside = 2, "Tick mark appears inside the axis";
        None = -4142, "No tick mark";
        Outside = 3, "Tick mark appears outside the axis";
    }
}

static TICK_MARK_XML: phf::Map<&'static str, XlTickMark> = phf_map! {
    "cross" => XlTickMark::Cross,
    "in" => XlTickMark::Inside,
    "none" => XlTickMark::None,
    "out" => XlTickMark::Outside,
};

impl XlTickMark {
    /// Convert the tick mark to its `c:majorTickMark/@val` value.
    pub fn to_xml(self) -> Result<&'static str, EnumError> {
        Ok(match self {
            Self::Cross => "cross",
            Self::Inside => "in",
            Self::None => "none",
            Self::Outside => "out",
        })
    }

    /// Parse a tick mark from its XML attribute value.
    pub fn from_xml(s: &str) -> Result<Self, EnumError> {
        TICK_MARK_XML
            .get(s)
            .copied()
            .ok_or_else(|| EnumError::UnknownXmlValue {
                enum_name: Self::MS_NAME,
                value: s.to_string(),
            })
    }
}

ms_enum! {
    /// Specifies the position of tick-mark labels on a chart axis.
    ///
    /// Corresponds to the VBA `XlTickLabelPosition` enumeration.
    pub enum XlTickLabelPosition ("XlTickLabelPosition", "http://msdn.microsoft.com/en-us/library/office/ff822561.aspx") {
        High = -4127, "Top or right side of the chart.";
        Low = -4134, "Bottom or left side of the chart.";
        NextToAxis = 4, "Next to axis (where axis is not at either side of the chart).";
        None = -4142, "No tick labels.";
    }
}

static TICK_LABEL_POSITION_XML: phf::Map<&'static str, XlTickLabelPosition> = phf_map! {
    "high" => XlTickLabelPosition::High,
    "low" => XlTickLabelPosition::Low,
    "nextTo" => XlTickLabelPosition::NextToAxis,
    "none" => XlTickLabelPosition::None,
};

impl XlTickLabelPosition {
    /// Convert the label position to its `c:tickLblPos/@val` value.
    pub fn to_xml(self) -> Result<&'static str, EnumError> {
        Ok(match self {
            Self::High => "high",
            Self::Low => "low",
            Self::NextToAxis => "nextTo",
            Self::None => "none",
        })
    }

    /// Parse a label position from its XML attribute value.
    pub fn from_xml(s: &str) -> Result<Self, EnumError> {
        TICK_LABEL_POSITION_XML
            .get(s)
            .copied()
            .ok_or_else(|| EnumError::UnknownXmlValue {
                enum_name: Self::MS_NAME,
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_type_table() {
        assert_eq!(XlChartType::ALL.len(), 73);
        assert_eq!(XlChartType::MS_NAME, "XlChartType");
        assert_eq!(XlChartType::ThreeDArea.value(), -4098);
        assert_eq!(XlChartType::Area.value(), 1);
        assert_eq!(XlChartType::BarClustered.value(), 57);
        assert_eq!(XlChartType::XyScatterSmoothNoMarkers.value(), 73);
        assert_eq!(XlChartType::PieOfPie.description(), "Pie of Pie.");
        assert_eq!(XlChartType::from_value(0), None);

        for member in XlChartType::ALL {
            assert_eq!(XlChartType::from_value(member.value()), Some(*member));
        }
    }

    #[test]
    fn test_legend_position_xml() {
        assert_eq!(XlLegendPosition::Corner.to_xml().unwrap(), "tr");
        assert_eq!(XlLegendPosition::from_xml("b").unwrap(), XlLegendPosition::Bottom);
        assert_eq!(
            XlLegendPosition::Custom.to_xml(),
            Err(EnumError::NotXmlMapped {
                enum_name: "XlLegendPosition",
                member: "Custom",
            })
        );
        assert!(matches!(
            XlLegendPosition::from_xml("x"),
            Err(EnumError::UnknownXmlValue { value, .. }) if value == "x"
        ));
        assert_eq!(XlLegendPosition::from_value(-4161), Some(XlLegendPosition::Custom));
    }

    #[test]
    fn test_tick_tables() {
        for member in XlTickMark::ALL {
            let xml = member.to_xml().unwrap();
            assert_eq!(XlTickMark::from_xml(xml).unwrap(), *member);
        }
        assert_eq!(XlTickMark::None.value(), XlTickLabelPosition::None.value());
        assert_eq!(XlTickLabelPosition::NextToAxis.to_xml().unwrap(), "nextTo");
        assert!(XlTickLabelPosition::from_xml("next").is_err());
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(XlChartType::ThreeDPie.to_string(), "ThreeDPie (-4102)");
        let json = serde_json::to_string(&XlTickMark::Inside).unwrap();
        assert_eq!(json, r#""Inside""#);
        let back: XlTickMark = serde_json::from_str(&json).unwrap();
        assert_eq!(back, XlTickMark::Inside);
    }
}
